//! PyO3 bindings for the streambar bar engine.
//!
//! Exposes one function per sampling policy plus a generic `run`:
//! - `tick`, `volume`, `dollar`, `change`, `time`
//! - `run(input, output, policy, *, size, config=None)`
//! - `init_logging(level="info")`
//!
//! Every function reads a tape file, writes a bar CSV and returns the number
//! of bars written. Failures raise a subclass of `StreambarError`.

use std::path::PathBuf;
use std::sync::Once;

use pyo3::create_exception;
use pyo3::exceptions::PyException;
use pyo3::prelude::*;
use tracing_subscriber::EnvFilter;

use streambar_core::{Config, Error as RustError, ErrorKind, PolicyKind};
use streambar_engine::SamplingPolicy;

// ============================================================================
// Exceptions
// ============================================================================

create_exception!(streambar, StreambarError, PyException, "Base class for streambar errors.");
create_exception!(streambar, SourceError, StreambarError, "The tape cannot be opened or read.");
create_exception!(streambar, ParseError, StreambarError, "A tape record is malformed.");
create_exception!(streambar, ConfigError, StreambarError, "Invalid size, policy or configuration.");
create_exception!(streambar, SinkError, StreambarError, "The bar file cannot be written.");

fn to_py_err(err: RustError) -> PyErr {
    let msg = err.to_string();
    match err.kind() {
        ErrorKind::Source => SourceError::new_err(msg),
        ErrorKind::Parse => ParseError::new_err(msg),
        ErrorKind::Config => ConfigError::new_err(msg),
        ErrorKind::Sink => SinkError::new_err(msg),
        ErrorKind::Internal => StreambarError::new_err(msg),
    }
}

// ============================================================================
// Bar functions
// ============================================================================

/// Run a whole-unit policy. Python ints may be negative, so the size is
/// taken signed and checked by the policy.
fn run_whole(
    py: Python<'_>,
    input: PathBuf,
    output: PathBuf,
    kind: PolicyKind,
    size: i64,
) -> PyResult<u64> {
    let policy = SamplingPolicy::from_whole(kind, size).map_err(to_py_err)?;
    py.allow_threads(|| {
        streambar_engine::run_with_policy(&input, &output, policy, &Config::default())
    })
    .map_err(to_py_err)
}

/// Tick bars: `size` trades per bar.
#[pyfunction]
#[pyo3(signature = (input, output, *, size = 100))]
fn tick(py: Python<'_>, input: PathBuf, output: PathBuf, size: i64) -> PyResult<u64> {
    run_whole(py, input, output, PolicyKind::Tick, size)
}

/// Volume bars: close once a bar holds `size` or more volume.
#[pyfunction]
#[pyo3(signature = (input, output, *, size = 100))]
fn volume(py: Python<'_>, input: PathBuf, output: PathBuf, size: i64) -> PyResult<u64> {
    run_whole(py, input, output, PolicyKind::Volume, size)
}

/// Dollar bars: close once a bar's notional reaches `size`.
#[pyfunction]
#[pyo3(signature = (input, output, *, size = 100.0))]
fn dollar(py: Python<'_>, input: PathBuf, output: PathBuf, size: f64) -> PyResult<u64> {
    py.allow_threads(|| streambar_engine::dollar(&input, &output, size))
        .map_err(to_py_err)
}

/// Change bars: a price `size` or more away from the bar's open starts a new bar.
#[pyfunction]
#[pyo3(signature = (input, output, *, size = 100.0))]
fn change(py: Python<'_>, input: PathBuf, output: PathBuf, size: f64) -> PyResult<u64> {
    py.allow_threads(|| streambar_engine::change(&input, &output, size))
        .map_err(to_py_err)
}

/// Time bars: windows of `size` marker units.
#[pyfunction]
#[pyo3(signature = (input, output, *, size = 100))]
fn time(py: Python<'_>, input: PathBuf, output: PathBuf, size: i64) -> PyResult<u64> {
    run_whole(py, input, output, PolicyKind::Time, size)
}

/// Run any policy by name, optionally with a JSON configuration.
///
/// `config` covers tape layout, delimiters, marker format and partial-output
/// handling. Its `bars` section is ignored, including invalid values there:
/// `policy` and `size` always decide the bars.
#[pyfunction]
#[pyo3(signature = (input, output, policy, *, size, config = None))]
fn run(
    py: Python<'_>,
    input: PathBuf,
    output: PathBuf,
    policy: &str,
    size: f64,
    config: Option<&str>,
) -> PyResult<u64> {
    let kind: PolicyKind = policy.parse().map_err(to_py_err)?;
    let config = match config {
        Some(json) => Config::parse_json(json).map_err(to_py_err)?,
        None => Config::default(),
    };
    py.allow_threads(|| streambar_engine::run(&input, &output, kind, size, &config))
        .map_err(to_py_err)
}

// ============================================================================
// Logging
// ============================================================================

static LOGGING: Once = Once::new();

/// Route engine logs to stderr. `RUST_LOG`, when set, overrides `level`.
///
/// Only the first call installs a subscriber.
#[pyfunction]
#[pyo3(signature = (level = "info"))]
fn init_logging(level: &str) -> PyResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| ConfigError::new_err(format!("invalid log level {level:?}: {e}")))?,
    };
    LOGGING.call_once(|| {
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!("streambar logging initialised");
        }
    });
    Ok(())
}

// ============================================================================
// Module Definition
// ============================================================================

/// Streambar - trade tape to bar file conversion.
#[pymodule]
fn streambar(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Bar functions
    m.add_function(wrap_pyfunction!(tick, m)?)?;
    m.add_function(wrap_pyfunction!(volume, m)?)?;
    m.add_function(wrap_pyfunction!(dollar, m)?)?;
    m.add_function(wrap_pyfunction!(change, m)?)?;
    m.add_function(wrap_pyfunction!(time, m)?)?;
    m.add_function(wrap_pyfunction!(run, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;

    // Exceptions
    let py = m.py();
    m.add("StreambarError", py.get_type_bound::<StreambarError>())?;
    m.add("SourceError", py.get_type_bound::<SourceError>())?;
    m.add("ParseError", py.get_type_bound::<ParseError>())?;
    m.add("ConfigError", py.get_type_bound::<ConfigError>())?;
    m.add("SinkError", py.get_type_bound::<SinkError>())?;

    Ok(())
}
