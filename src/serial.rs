//! # Serial Logging
//!
//! Kernel log output over the first 16550 UART (COM1).
//!
//! | Macro        | Prefix    |
//! |--------------|-----------|
//! | `log_info!`  | `[INFO]`  |
//! | `log_warn!`  | `[WARN]`  |
//! | `log_error!` | `[ERROR]` |
//! | `log_debug!` | `[DEBUG]` |
//!
//! Interrupt handlers must not log: the interrupted code may be holding the
//! port lock, and spinning on it from the handler never returns.

use spin::Mutex;
use uart_16550::SerialPort;

pub const COM1_PORT: u16 = 0x3F8;

pub static SERIAL: Mutex<SerialPort> = Mutex::new(unsafe { SerialPort::new(COM1_PORT) });

pub fn init() {
    SERIAL.lock().init();
}

#[doc(hidden)]
pub fn _print(args: ::core::fmt::Arguments) {
    use ::core::fmt::Write;
    let _ = SERIAL.lock().write_fmt(args);
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {{
        #[cfg(not(test))]
        $crate::serial::_print(format_args!($($arg)*));
        #[cfg(test)]
        ::std::print!($($arg)*);
    }};
}

#[macro_export]
macro_rules! println {
    () => { $crate::print!("\n") };
    ($($arg:tt)*) => {{
        $crate::print!("{}\n", format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::println!("[INFO] {}", format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::println!("[WARN] {}", format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::println!("[ERROR] {}", format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(debug_assertions)]
        $crate::println!("[DEBUG] {}", format_args!($($arg)*));
    }};
}
