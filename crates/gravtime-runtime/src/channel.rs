//! Device channel
//!
//! Per iteration the driver reports the current time factor to a device and
//! waits a bounded time for its status line. A real device speaks a line
//! protocol over any byte stream; without one, [`SimulatedDevice`] synthesizes
//! the acknowledgment a device would send.
//!
//! Wire format (one request, one response, newline terminated):
//!
//! ```text
//! -> SET_DILATION 20000 0.999999999997841
//! <- ACK SET_DILATION altitude=20000 factor=0.999999999997841
//! ```

use std::future::Future;
use std::time::Duration;

use bigdecimal::BigDecimal;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::runtime::Runtime;
use tokio::time::timeout;

use gravtime_core::{fixed, GravtimeError, GravtimeResult, TIME_FACTOR_SCALE};

/// Command sent for every simulated altitude
pub const SET_DILATION: &str = "SET_DILATION";

/// One request to the device
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRequest {
    pub command: String,
    pub altitude: u64,
    pub time_factor: BigDecimal,
}

impl DeviceRequest {
    pub fn new(command: impl Into<String>, altitude: u64, time_factor: BigDecimal) -> Self {
        DeviceRequest {
            command: command.into(),
            altitude,
            time_factor,
        }
    }

    /// `SET_DILATION` request for an altitude
    pub fn set_dilation(altitude: u64, time_factor: BigDecimal) -> Self {
        Self::new(SET_DILATION, altitude, time_factor)
    }

    fn factor_text(&self) -> String {
        fixed(&self.time_factor, TIME_FACTOR_SCALE)
    }

    /// Request line without the terminator
    pub fn to_line(&self) -> String {
        format!("{} {} {}", self.command, self.altitude, self.factor_text())
    }
}

/// Something that answers device requests
///
/// An exchange may be dropped at any await point when the wait bound expires.
pub trait DeviceBackend: Send {
    fn exchange(
        &mut self,
        request: &DeviceRequest,
    ) -> impl Future<Output = GravtimeResult<String>> + Send;
}

/// Stand-in device that acknowledges every request
///
/// The response depends only on the request; the seeded latency only changes
/// how long the answer takes.
#[derive(Debug)]
pub struct SimulatedDevice {
    base_latency: Duration,
    jitter: Duration,
    rng: StdRng,
}

impl SimulatedDevice {
    /// Instant device
    pub fn new(seed: u64) -> Self {
        SimulatedDevice {
            base_latency: Duration::ZERO,
            jitter: Duration::ZERO,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Respond after `base + uniform(0..=jitter)`
    pub fn with_latency(mut self, base: Duration, jitter: Duration) -> Self {
        self.base_latency = base;
        self.jitter = jitter;
        self
    }

    /// The acknowledgment a device sends for `request`
    pub fn acknowledgment(request: &DeviceRequest) -> String {
        format!(
            "ACK {} altitude={} factor={}",
            request.command,
            request.altitude,
            request.factor_text()
        )
    }

    fn latency(&mut self) -> Duration {
        let jitter_us = self.jitter.as_micros() as u64;
        if jitter_us == 0 {
            return self.base_latency;
        }
        self.base_latency + Duration::from_micros(self.rng.gen_range(0..=jitter_us))
    }
}

impl DeviceBackend for SimulatedDevice {
    async fn exchange(&mut self, request: &DeviceRequest) -> GravtimeResult<String> {
        let delay = self.latency();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(Self::acknowledgment(request))
    }
}

/// Device reached through a byte stream (socket, serial bridge, pipe)
///
/// Requests whose exchange timed out may still be answered later. Those
/// answers are read and discarded before the next response is returned.
pub struct StreamDevice<R, W> {
    reader: BufReader<R>,
    writer: W,
    /// Partial response line; kept across dropped exchanges
    line: String,
    /// Requests written whose response has not been read yet
    unanswered: usize,
}

/// Stream device over TCP
pub type TcpDevice = StreamDevice<OwnedReadHalf, OwnedWriteHalf>;

impl<R, W> StreamDevice<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        StreamDevice {
            reader: BufReader::new(reader),
            writer,
            line: String::new(),
            unanswered: 0,
        }
    }

    async fn read_response(&mut self) -> GravtimeResult<String> {
        loop {
            let read = self
                .reader
                .read_line(&mut self.line)
                .await
                .map_err(|e| GravtimeError::Device(format!("read failed: {}", e)))?;
            if read == 0 {
                return Err(GravtimeError::ChannelClosed);
            }
            if self.line.ends_with('\n') {
                break;
            }
        }
        let response = self.line.trim_end().to_string();
        self.line.clear();
        self.unanswered = self.unanswered.saturating_sub(1);
        Ok(response)
    }
}

impl TcpDevice {
    /// Connect to a device exposed over TCP
    pub async fn connect(addr: impl ToSocketAddrs) -> GravtimeResult<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| GravtimeError::Device(format!("connect failed: {}", e)))?;
        stream
            .set_nodelay(true)
            .map_err(|e| GravtimeError::Device(e.to_string()))?;
        let (reader, writer) = stream.into_split();
        Ok(Self::new(reader, writer))
    }
}

impl<R, W> DeviceBackend for StreamDevice<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn exchange(&mut self, request: &DeviceRequest) -> GravtimeResult<String> {
        let line = format!("{}\n", request.to_line());
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| GravtimeError::Device(format!("write failed: {}", e)))?;
        self.unanswered += 1;
        self.writer
            .flush()
            .await
            .map_err(|e| GravtimeError::Device(format!("write failed: {}", e)))?;

        while self.unanswered > 1 {
            let late = self.read_response().await?;
            tracing::debug!(response = %late, "discarding late device response");
        }
        self.read_response().await
    }
}

/// A channel the driver can send requests through
pub trait DeviceChannel {
    fn send(&mut self, request: DeviceRequest) -> GravtimeResult<String>;
}

fn device_runtime() -> GravtimeResult<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()
        .map_err(|e| GravtimeError::Device(format!("cannot start device runtime: {}", e)))
}

/// Drives a backend on its own current-thread runtime and bounds every
/// exchange with a timeout
///
/// Must not be used from inside another tokio runtime.
pub struct TimedChannel<B> {
    runtime: Runtime,
    backend: B,
    timeout: Duration,
}

impl<B: DeviceBackend> TimedChannel<B> {
    pub fn new(backend: B, timeout: Duration) -> GravtimeResult<Self> {
        Ok(TimedChannel {
            runtime: device_runtime()?,
            backend,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl TimedChannel<TcpDevice> {
    /// Connect to a TCP device; the connection attempt shares the exchange bound
    pub fn connect(addr: &str, bound: Duration) -> GravtimeResult<Self> {
        let runtime = device_runtime()?;
        let backend = runtime
            .block_on(async { timeout(bound, TcpDevice::connect(addr)).await })
            .map_err(|_| GravtimeError::ChannelTimeout(bound))??;
        tracing::info!(addr, "device connected");
        Ok(TimedChannel {
            runtime,
            backend,
            timeout: bound,
        })
    }
}

impl<B: DeviceBackend> DeviceChannel for TimedChannel<B> {
    fn send(&mut self, request: DeviceRequest) -> GravtimeResult<String> {
        let bound = self.timeout;
        let backend = &mut self.backend;
        self.runtime.block_on(async move {
            match timeout(bound, backend.exchange(&request)).await {
                Ok(result) => result,
                Err(_) => Err(GravtimeError::ChannelTimeout(bound)),
            }
        })
    }
}
