//! Polling demo - print the merged pointer whenever it changes.
//!
//! Usage:
//!   cargo run --example poll
//!
//! Press Left+Middle to quit, Left+Right to restart the driver, or Ctrl+C.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tinymouse::{Driver, DriverConfig, MASK_LEFT, MASK_MIDDLE, MASK_RIGHT};

const QUIT: u8 = MASK_LEFT | MASK_MIDDLE;
const RESTART: u8 = MASK_LEFT | MASK_RIGHT;

fn main() -> tinymouse::Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    // Handle Ctrl+C
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
        println!("\nStopping...");
    })
    .expect("Error setting Ctrl-C handler");

    let driver = Driver::new(DriverConfig::default());
    let mut last = None;

    loop {
        println!("Initialize tinymouse.");
        driver.init(0, 0, 640, 480)?;
        println!("Press Left and Middle to quit, Left and Right to restart.");

        let mut restart = false;
        while running.load(Ordering::SeqCst) {
            let state = (driver.xy(), driver.buttons());
            if last != Some(state) {
                let ((x, y), _) = state;
                println!(
                    "mouse pos=({x},{y}) {}{}{}",
                    if driver.is_left_pressed() { 'L' } else { '_' },
                    if driver.is_middle_pressed() { 'M' } else { '_' },
                    if driver.is_right_pressed() { 'R' } else { '_' },
                );
                last = Some(state);
            }

            let buttons = state.1;
            if buttons & QUIT == QUIT {
                break;
            }
            if buttons & RESTART == RESTART {
                restart = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        println!("Dispose tinymouse.");
        driver.dispose()?;
        if !restart {
            return Ok(());
        }
    }
}
