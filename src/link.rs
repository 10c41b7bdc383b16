//! Line protocol to the sensor/gate controller
//!
//! Inbound lines report sensor transitions (`ENTRY:0`, `ENTRY:1`, `EXIT:0`,
//! `EXIT:1`). Outbound commands are `O`, `C` and `SLOTS:<n>`, each
//! newline-terminated. The byte transport underneath is any tokio stream.

use crate::config::{LinkConfig, LinkTransport};
use crate::error::{ParkgateError, Result};
use crate::logging::get_logger;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Split};
use tokio::time::{sleep, timeout};

/// Which side of the lot a sensor watches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Entry,
    Exit,
}

impl Lane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Entry => "entry",
            Lane::Exit => "exit",
        }
    }
}

/// Sensor reading carried by an inbound line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    /// A vehicle is in front of the sensor (`:0`)
    Occupied,
    /// The vehicle moved away (`:1`)
    Clear,
}

/// One inbound sensor transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorEvent {
    pub lane: Lane,
    pub state: SensorState,
}

/// Parse an inbound line; `None` for anything that is not a sensor report
pub fn parse_sensor_line(line: &str) -> Option<SensorEvent> {
    let line = line.trim();
    let (lane, state) = if line.starts_with("ENTRY:0") {
        (Lane::Entry, SensorState::Occupied)
    } else if line.starts_with("ENTRY:1") {
        (Lane::Entry, SensorState::Clear)
    } else if line.starts_with("EXIT:0") {
        (Lane::Exit, SensorState::Occupied)
    } else if line.starts_with("EXIT:1") {
        (Lane::Exit, SensorState::Clear)
    } else {
        return None;
    };
    Some(SensorEvent { lane, state })
}

/// Outbound command for the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateCommand {
    Open,
    Close,
    /// Show remaining capacity on the controller display
    Slots(u32),
}

impl fmt::Display for GateCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateCommand::Open => write!(f, "O"),
            GateCommand::Close => write!(f, "C"),
            GateCommand::Slots(n) => write!(f, "SLOTS:{}", n),
        }
    }
}

impl GateCommand {
    /// Wire form including the terminating newline
    pub fn encode(&self) -> String {
        format!("{}\n", self)
    }
}

/// Bidirectional link to the controller
#[async_trait]
pub trait HardwareLink: Send {
    /// Next pending line, or `None` when nothing arrived within `wait`.
    /// A closed or broken link is an error.
    async fn poll_line(&mut self, wait: Duration) -> Result<Option<String>>;

    /// Write one command. No acknowledgement is expected.
    async fn send(&mut self, command: GateCommand) -> Result<()>;

    /// Release the link
    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Newline-delimited link over any byte stream
pub struct LineLink<R, W> {
    lines: Split<BufReader<R>>,
    writer: W,
    logger: crate::logging::StructuredLogger,
}

impl<R, W> LineLink<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            lines: BufReader::new(reader).split(b'\n'),
            writer,
            logger: get_logger("link"),
        }
    }
}

#[async_trait]
impl<R, W> HardwareLink for LineLink<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn poll_line(&mut self, wait: Duration) -> Result<Option<String>> {
        // next_segment is cancel safe, so a timeout never drops partial input
        match timeout(wait, self.lines.next_segment()).await {
            Err(_) => Ok(None),
            Ok(Ok(Some(bytes))) => {
                let line = String::from_utf8_lossy(&bytes)
                    .trim_end_matches('\r')
                    .to_string();
                self.logger.trace(&format!("<- {}", line));
                Ok(Some(line))
            }
            Ok(Ok(None)) => Err(ParkgateError::hardware_link("Link closed by peer")),
            Ok(Err(e)) => Err(ParkgateError::hardware_link(format!("Read failed: {}", e))),
        }
    }

    async fn send(&mut self, command: GateCommand) -> Result<()> {
        self.logger.trace(&format!("-> {}", command));
        self.writer
            .write_all(command.encode().as_bytes())
            .await
            .map_err(|e| ParkgateError::hardware_link(format!("Write failed: {}", e)))?;
        self.writer
            .flush()
            .await
            .map_err(|e| ParkgateError::hardware_link(format!("Flush failed: {}", e)))
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.writer
            .shutdown()
            .await
            .map_err(|e| ParkgateError::hardware_link(format!("Shutdown failed: {}", e)))
    }
}

/// Open the configured link and wait for the controller to settle
pub async fn open_link(config: &LinkConfig) -> Result<Box<dyn HardwareLink>> {
    let logger = get_logger("link");
    let link: Box<dyn HardwareLink> = match config.transport {
        LinkTransport::Tcp => {
            logger.info(&format!("Connecting to serial bridge at {}", config.address));
            let stream = tokio::net::TcpStream::connect(&config.address)
                .await
                .map_err(|e| {
                    ParkgateError::hardware_link(format!(
                        "Failed to connect to {}: {}",
                        config.address, e
                    ))
                })?;
            let (read, write) = stream.into_split();
            Box::new(LineLink::new(read, write))
        }
        LinkTransport::Device => {
            logger.info(&format!("Opening controller device {}", config.device));
            let file = tokio::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .open(&config.device)
                .await
                .map_err(|e| {
                    ParkgateError::hardware_link(format!(
                        "Failed to open {}: {}",
                        config.device, e
                    ))
                })?;
            let (read, write) = tokio::io::split(file);
            Box::new(LineLink::new(read, write))
        }
    };

    if config.settle_delay_ms > 0 {
        logger.debug(&format!(
            "Waiting {} ms for the controller to reset",
            config.settle_delay_ms
        ));
        sleep(Duration::from_millis(config.settle_delay_ms)).await;
    }
    logger.info("Hardware link ready");
    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sensor_lines() {
        assert_eq!(
            parse_sensor_line("ENTRY:0"),
            Some(SensorEvent {
                lane: Lane::Entry,
                state: SensorState::Occupied
            })
        );
        assert_eq!(
            parse_sensor_line("  EXIT:1\r"),
            Some(SensorEvent {
                lane: Lane::Exit,
                state: SensorState::Clear
            })
        );
        assert_eq!(
            parse_sensor_line("EXIT:0 extra").map(|e| e.state),
            Some(SensorState::Occupied)
        );
        assert_eq!(parse_sensor_line("SLOTS:3"), None);
        assert_eq!(parse_sensor_line(""), None);
        assert_eq!(parse_sensor_line("entry:0"), None);
    }

    #[test]
    fn encodes_commands() {
        assert_eq!(GateCommand::Open.encode(), "O\n");
        assert_eq!(GateCommand::Close.encode(), "C\n");
        assert_eq!(GateCommand::Slots(3).encode(), "SLOTS:3\n");
    }

    #[tokio::test]
    async fn line_link_round_trips_over_a_duplex_stream() {
        let (ours, theirs) = tokio::io::duplex(256);
        let (r, w) = tokio::io::split(ours);
        let mut link = LineLink::new(r, w);
        let (mut peer_r, mut peer_w) = tokio::io::split(theirs);

        peer_w.write_all(b"ENTRY:0\r\nEXIT:1\n").await.unwrap();
        let wait = Duration::from_millis(50);
        assert_eq!(link.poll_line(wait).await.unwrap().as_deref(), Some("ENTRY:0"));
        assert_eq!(link.poll_line(wait).await.unwrap().as_deref(), Some("EXIT:1"));
        assert_eq!(link.poll_line(wait).await.unwrap(), None);

        link.send(GateCommand::Slots(2)).await.unwrap();
        let mut buf = [0u8; 8];
        let n = tokio::io::AsyncReadExt::read(&mut peer_r, &mut buf)
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"SLOTS:2\n");

        drop(peer_w);
        drop(peer_r);
        assert!(matches!(
            link.poll_line(wait).await,
            Err(ParkgateError::HardwareLink { .. })
        ));
    }
}
