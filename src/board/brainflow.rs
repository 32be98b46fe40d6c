use anyhow::{anyhow, bail, Context, Result};
use libloading::Library;
use log::{debug, info, warn};
use ndarray::Array2;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_double, c_int};
use crate::board::BoardSource;
const BOARD_ID_CYTON: c_int = 0;
const NO_BOARD: i32 = -100;
const PRESET_DEFAULT: c_int = 0;
const STREAM_RINGBUF_PACKETS: c_int = 450_000;
const CONFIG_RESPONSE_BYTES: usize = 8192;
#[cfg(target_os = "windows")]
pub const DEFAULT_LIBRARY: &str = "BoardController.dll";
#[cfg(target_os = "macos")]
pub const DEFAULT_LIBRARY: &str = "libBoardController.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const DEFAULT_LIBRARY: &str = "libBoardController.so";
/// JSON body BrainFlow expects for every session call. All keys must be
/// present; only the serial port matters for a Cyton.
#[derive(Serialize, Default)]
struct BrainFlowInputParams {
    serial_port: String,
    mac_address: String,
    ip_address: String,
    ip_address_aux: String,
    ip_address_anc: String,
    ip_port: i32,
    ip_port_aux: i32,
    ip_port_anc: i32,
    ip_protocol: i32,
    other_info: String,
    timeout: i32,
    serial_number: String,
    file: String,
    file_aux: String,
    file_anc: String,
    master_board: i32,
}
impl BrainFlowInputParams {
    fn for_serial(port: &str) -> Self {
        Self {
            serial_port: port.to_owned(),
            master_board: NO_BOARD,
            ..Default::default()
        }
    }
}
type SessionFn = unsafe extern "C" fn(c_int, *const c_char) -> c_int;
type BoardQueryFn = unsafe extern "C" fn(c_int, c_int, *mut c_int) -> c_int;
type ConfigFn =
    unsafe extern "C" fn(*const c_char, *mut c_char, *mut c_int, c_int, *const c_char) -> c_int;
type StartFn = unsafe extern "C" fn(c_int, *const c_char, c_int, *const c_char) -> c_int;
type ChannelsFn = unsafe extern "C" fn(c_int, c_int, *mut c_int, *mut c_int) -> c_int;
type DataFn =
    unsafe extern "C" fn(c_int, c_int, *mut c_double, *mut c_int, c_int, *const c_char) -> c_int;
/// Maps a BrainFlow exit code onto a `Result`.
fn exit_code(code: c_int, call: &str) -> Result<()> {
    match code {
        0 => Ok(()),
        code => Err(anyhow!("{call} failed (BrainFlow code {code})")),
    }
}
struct BrainFlowApi {
    _lib: Library,
    prepare_session: SessionFn,
    config_board: ConfigFn,
    start_stream: StartFn,
    stop_stream: SessionFn,
    release_session: SessionFn,
    get_sampling_rate: BoardQueryFn,
    get_num_rows: BoardQueryFn,
    get_eeg_channels: ChannelsFn,
    get_current_board_data: DataFn,
}
impl BrainFlowApi {
    fn load(path: &str) -> Result<Self> {
        let lib = unsafe { Library::new(path) }
            .with_context(|| format!("BrainFlow board controller `{path}` could not be loaded"))?;
        // Safety: signatures match the BrainFlow board_controller C header.
        unsafe {
            Ok(Self {
                prepare_session: *lib.get(b"prepare_session\0")?,
                config_board: *lib.get(b"config_board\0")?,
                start_stream: *lib.get(b"start_stream\0")?,
                stop_stream: *lib.get(b"stop_stream\0")?,
                release_session: *lib.get(b"release_session\0")?,
                get_sampling_rate: *lib.get(b"get_sampling_rate\0")?,
                get_num_rows: *lib.get(b"get_num_rows\0")?,
                get_eeg_channels: *lib.get(b"get_eeg_channels\0")?,
                get_current_board_data: *lib.get(b"get_current_board_data\0")?,
                _lib: lib,
            })
        }
    }
    /// The library is loaded once per process; later paths are ignored.
    fn instance(path: &str) -> Result<&'static BrainFlowApi> {
        static API: OnceCell<BrainFlowApi> = OnceCell::new();
        API.get_or_try_init(|| Self::load(path))
    }
    /// prepare/stop/release all take `(board_id, params)`.
    fn session_call(&self, call: SessionFn, input: &CString, name: &str) -> Result<()> {
        exit_code(unsafe { call(BOARD_ID_CYTON, input.as_ptr()) }, name)
    }
    /// Static board description lookups that fill a single int.
    fn board_query(&self, query: BoardQueryFn, name: &str) -> Result<usize> {
        let mut value: c_int = 0;
        exit_code(unsafe { query(BOARD_ID_CYTON, PRESET_DEFAULT, &mut value) }, name)?;
        Ok(value.max(0) as usize)
    }
    fn config(&self, input: &CString, command: &str) -> Result<String> {
        let config = CString::new(command).context("config command contains a NUL byte")?;
        let mut response = vec![0 as c_char; CONFIG_RESPONSE_BYTES];
        let mut response_len: c_int = 0;
        let code = unsafe {
            (self.config_board)(
                config.as_ptr(),
                response.as_mut_ptr(),
                &mut response_len,
                BOARD_ID_CYTON,
                input.as_ptr(),
            )
        };
        exit_code(code, "config_board")?;
        let len = (response_len.max(0) as usize).min(CONFIG_RESPONSE_BYTES - 1);
        response[len] = 0;
        // Safety: the buffer is NUL-terminated at `len` above.
        let text = unsafe { CStr::from_ptr(response.as_ptr()) };
        Ok(text.to_string_lossy().into_owned())
    }
    fn start_stream(&self, input: &CString) -> Result<()> {
        let code = unsafe {
            (self.start_stream)(STREAM_RINGBUF_PACKETS, std::ptr::null(), BOARD_ID_CYTON, input.as_ptr())
        };
        exit_code(code, "start_stream")
    }
    fn eeg_channels(&self) -> Result<Vec<usize>> {
        let mut len: c_int = 0;
        let mut rows = vec![0 as c_int; 64];
        let code = unsafe {
            (self.get_eeg_channels)(BOARD_ID_CYTON, PRESET_DEFAULT, rows.as_mut_ptr(), &mut len)
        };
        exit_code(code, "get_eeg_channels")?;
        rows.truncate(len.max(0) as usize);
        Ok(rows.into_iter().map(|row| row.max(0) as usize).collect())
    }
    /// Newest `max_samples` columns of the ring buffer, without removing them.
    fn current_board_data(
        &self,
        input: &CString,
        num_rows: usize,
        max_samples: usize,
    ) -> Result<Array2<f64>> {
        let mut packed = vec![0.0f64; num_rows * max_samples];
        let mut returned: c_int = 0;
        let code = unsafe {
            (self.get_current_board_data)(
                max_samples as c_int,
                PRESET_DEFAULT,
                packed.as_mut_ptr(),
                &mut returned,
                BOARD_ID_CYTON,
                input.as_ptr(),
            )
        };
        exit_code(code, "get_current_board_data")?;
        let samples = (returned.max(0) as usize).min(max_samples);
        // Rows are packed back to back with stride `samples`.
        packed.truncate(num_rows * samples);
        Array2::from_shape_vec((num_rows, samples), packed)
            .map_err(|e| anyhow!("board data has unexpected shape: {e}"))
    }
}
/// Logs the serial ports that do exist when `port` is not among them.
/// BrainFlow is still asked to open the port afterwards.
pub fn warn_if_port_missing(port: &str) {
    match serialport::available_ports() {
        Ok(ports) if ports.iter().any(|p| p.port_name == port) => {}
        Ok(ports) => {
            let names: Vec<&str> = ports.iter().map(|p| p.port_name.as_str()).collect();
            warn!("serial port {port} not found; available: [{}]", names.join(", "));
        }
        Err(e) => debug!("could not enumerate serial ports: {e}"),
    }
}
/// BrainFlow-backed session for an OpenBCI Cyton on a serial dongle.
pub struct BrainFlowBoard {
    port_name: String,
    api: &'static BrainFlowApi,
    input_json: CString,
    num_rows: usize,
    prepared: bool,
    is_streaming: bool,
}
impl BrainFlowBoard {
    /// Loads the board controller library; no hardware is touched yet.
    pub fn new(port_name: &str, library: &str) -> Result<Self> {
        let api = BrainFlowApi::instance(library)?;
        let params = BrainFlowInputParams::for_serial(port_name);
        let json = serde_json::to_string(&params)?;
        let input_json =
            CString::new(json).context("failed to encode BrainFlow input params to C string")?;
        Ok(Self {
            port_name: port_name.to_string(),
            api,
            input_json,
            num_rows: 0,
            prepared: false,
            is_streaming: false,
        })
    }
}
impl BoardSource for BrainFlowBoard {
    fn describe(&self) -> String {
        format!("Cyton on {}", self.port_name)
    }
    fn prepare_session(&mut self) -> Result<()> {
        if self.prepared {
            return Ok(());
        }
        let api = self.api;
        api.session_call(api.prepare_session, &self.input_json, "prepare_session")?;
        self.num_rows = api.board_query(api.get_num_rows, "get_num_rows")?;
        self.prepared = true;
        info!("BrainFlow session prepared on {} ({} rows)", self.port_name, self.num_rows);
        Ok(())
    }
    fn config_board(&mut self, command: &str) -> Result<String> {
        if !self.prepared {
            bail!("config_board called before prepare_session");
        }
        let response = self.api.config(&self.input_json, command)?;
        debug!("config_board `{command}` -> {response:?}");
        Ok(response)
    }
    fn start_stream(&mut self) -> Result<()> {
        if !self.is_streaming {
            self.api.start_stream(&self.input_json)?;
            self.is_streaming = true;
        }
        Ok(())
    }
    fn sampling_rate(&self) -> Result<u32> {
        let rate = self.api.board_query(self.api.get_sampling_rate, "get_sampling_rate")?;
        Ok(u32::try_from(rate)?)
    }
    fn eeg_channels(&self) -> Result<Vec<usize>> {
        self.api.eeg_channels()
    }
    fn current_board_data(&mut self, max_samples: usize) -> Result<Array2<f64>> {
        if !self.is_streaming {
            bail!("stream is not running");
        }
        self.api
            .current_board_data(&self.input_json, self.num_rows, max_samples)
    }
    fn stop_stream(&mut self) -> Result<()> {
        if self.is_streaming {
            let api = self.api;
            api.session_call(api.stop_stream, &self.input_json, "stop_stream")?;
            self.is_streaming = false;
        }
        Ok(())
    }
    fn release_session(&mut self) -> Result<()> {
        if self.prepared {
            let api = self.api;
            api.session_call(api.release_session, &self.input_json, "release_session")?;
            self.prepared = false;
        }
        Ok(())
    }
}
impl Drop for BrainFlowBoard {
    fn drop(&mut self) {
        let _ = self.stop_stream();
        let _ = self.release_session();
    }
}
