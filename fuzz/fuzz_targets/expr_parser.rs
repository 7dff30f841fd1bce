#![no_main]

use libfuzzer_sys::fuzz_target;

use gravtime_precision::{parse_expr, Evaluator, PrecisionEvaluator};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 256 {
        return;
    }
    if let Ok(expr) = parse_expr(text) {
        // printed form must parse back to the same tree
        let reparsed = parse_expr(&expr.to_string()).expect("printed expression reparses");
        assert_eq!(reparsed, expr);
        let _ = PrecisionEvaluator::new().evaluate(&expr, 15);
    }
});
