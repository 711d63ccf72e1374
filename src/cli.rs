// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for scanner operations
//!
//! This module provides command-line functionality for:
//! - Scanning still images
//! - Live scanning from a capture device
//! - Listing capture devices

use barcode_scanner::{Detection, ScannerBuilder, ScannerConfig, StillSource};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scan a still image and print every distinct detection
pub fn scan_image(image: PathBuf, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !image.exists() {
        return Err(format!("No such file: {}", image.display()).into());
    }

    // A still frame decodes on the first tick; tick fast and stop quickly
    let config = ScannerConfig {
        sample_interval_ms: 25,
        ..ScannerConfig::load()
    };

    let detections: Arc<Mutex<Vec<Detection>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&detections);
    let scanner = ScannerBuilder::new()
        .with_config(config)
        .source(StillSource::new(&image))
        .on_detected(move |detection| {
            // The same frame re-decodes every tick; keep each symbol once
            let mut seen = sink.lock().unwrap();
            if !seen.contains(&detection) {
                seen.push(detection);
            }
        })
        .build_callback()?;

    scanner.start()?;
    std::thread::sleep(Duration::from_millis(100));
    scanner.stop();

    let detections = detections.lock().unwrap().clone();
    if json {
        println!("{}", serde_json::to_string_pretty(&detections)?);
        return Ok(());
    }
    if detections.is_empty() {
        return Err("No symbols found".into());
    }
    for detection in &detections {
        println!("{}", detection);
    }
    Ok(())
}

/// Scan live from a capture device until Ctrl+C or the first detection
#[cfg(feature = "v4l")]
pub fn live(
    device: Option<String>,
    interval: Option<u64>,
    once: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::atomic::{AtomicBool, Ordering};

    let mut config = ScannerConfig::load();
    if let Some(ms) = interval {
        config.sample_interval_ms = ms;
    }
    if let Some(path) = device {
        config.device_path = Some(path);
    }

    let last: Arc<Mutex<Option<Detection>>> = Arc::new(Mutex::new(None));
    let last_clone = Arc::clone(&last);
    let scanner = ScannerBuilder::new()
        .with_config(config)
        .on_detected(move |detection| {
            // A symbol held in view re-reports every tick; print changes only
            let mut last = last_clone.lock().unwrap();
            if last.as_ref() != Some(&detection) {
                println!("{}", detection);
                *last = Some(detection);
            }
        })
        .on_error(|e| eprintln!("Scanner error: {}", e))
        .build_callback()?;

    scanner.start()?;

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!("Scanning... (press Ctrl+C to stop)");

    while !stop_flag.load(Ordering::SeqCst) {
        if once && scanner.last_detection().is_some() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    scanner.stop();
    Ok(())
}

#[cfg(not(feature = "v4l"))]
pub fn live(
    _device: Option<String>,
    _interval: Option<u64>,
    _once: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    Err("Capture support is not built in; rebuild with --features v4l".into())
}

/// List all available capture devices
#[cfg(feature = "v4l")]
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    use barcode_scanner::source::v4l2::enumerate_devices;

    let devices = enumerate_devices();

    if devices.is_empty() {
        println!("No capture devices found.");
        return Ok(());
    }

    println!("Available capture devices:");
    println!();
    for (index, device) in devices.iter().enumerate() {
        println!(
            "  [{}] {} - {} ({})",
            index, device.path, device.card, device.driver
        );
    }

    Ok(())
}

#[cfg(not(feature = "v4l"))]
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    Err("Capture support is not built in; rebuild with --features v4l".into())
}
