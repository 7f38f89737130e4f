use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ipdr_engine::{Collector, CsvFileFactory, EngineError};
use ipdr_frame::FrameError;
use tracing::info;

use crate::cmd::RunArgs;
use crate::config::FileConfig;
use crate::exit::{engine_error, io_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};

/// Keeps the receive thread's blocking reads short enough to notice a
/// shutdown request.
const READ_TIMEOUT: Duration = Duration::from_secs(1);

pub fn run(args: RunArgs) -> CliResult<i32> {
    let config = FileConfig::load(&args.config)?;

    let target = (config.exporter.address.as_str(), config.exporter.port);
    let addr = target
        .to_socket_addrs()
        .map_err(|e| io_error("resolving exporter address", e))?
        .next()
        .ok_or_else(|| {
            CliError::new(
                FAILURE,
                format!("exporter address {:?} resolved to nothing", target.0),
            )
        })?;

    info!(%addr, "connecting to exporter");
    let stream = TcpStream::connect_timeout(
        &addr,
        Duration::from_secs(config.exporter.connect_timeout),
    )
    .map_err(|e| io_error("connecting to exporter", e))?;
    stream
        .set_read_timeout(Some(READ_TIMEOUT))
        .map_err(|e| io_error("configuring socket", e))?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        let socket = stream
            .try_clone()
            .map_err(|e| io_error("cloning socket", e))?;
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
            let _ = socket.shutdown(Shutdown::Both);
        })
        .map_err(|e| CliError::new(INTERNAL, format!("installing signal handler: {e}")))?;
    }

    let reader = stream
        .try_clone()
        .map_err(|e| io_error("cloning socket", e))?;
    let factory = CsvFileFactory::new(&config.collector.output_dir);
    let collector = Collector::new(config.collector_config(), Box::new(factory));

    match collector.run(reader, stream, Arc::clone(&stop)) {
        Ok(()) => Ok(SUCCESS),
        Err(EngineError::Frame(FrameError::ConnectionClosed)) if stop.load(Ordering::SeqCst) => {
            info!("shutdown requested, link closed");
            Ok(SUCCESS)
        }
        Err(EngineError::Frame(FrameError::ConnectionClosed)) => Err(CliError::new(
            FAILURE,
            "exporter closed the connection".to_string(),
        )),
        Err(err) if stop.load(Ordering::SeqCst) => {
            // Shutdown raced the link teardown; the user asked for this.
            info!(error = %err, "shutdown requested");
            Ok(SUCCESS)
        }
        Err(err) => Err(engine_error("collection link", err)),
    }
}
