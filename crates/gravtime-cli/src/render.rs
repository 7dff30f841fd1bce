//! ASCII bar rendering

use gravtime_analysis::ProjectedBar;
use gravtime_core::{fixed, DIFFERENCE_SCALE};

/// One line per bar: altitude, bar padded to `width`, value
pub fn render_bars(bars: &[ProjectedBar], width: usize) -> String {
    let mut out = String::new();
    for bar in bars {
        let fill = "#".repeat(bar.bar_len.min(width));
        out.push_str(&format!(
            "{:>8} km | {:<width$} | {}\n",
            fixed(&bar.altitude_km, 1),
            fill,
            fixed(&bar.difference_ns, DIFFERENCE_SCALE),
            width = width
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    #[test]
    fn test_render_pads_bars() {
        let bars = vec![ProjectedBar {
            altitude_km: BigDecimal::from_str("12.5").unwrap(),
            difference_ns: BigDecimal::from_str("3").unwrap(),
            bar_len: 3,
        }];
        assert_eq!(render_bars(&bars, 5), "    12.5 km | ###   | 3.00\n");
    }
}
