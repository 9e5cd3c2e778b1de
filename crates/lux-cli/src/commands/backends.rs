//! Filter backend report.

use crate::BackendsArgs;
use anyhow::{Context, Result};
use lux_core::{WorkerPool, default_workers};
use lux_filter::FilterEngine;

/// Prints available backends and the effective filter configuration.
pub fn run(args: BackendsArgs) -> Result<()> {
    let engine = FilterEngine::shared();
    println!("Backends:");
    print!("{}", engine.describe_backends());

    let config = engine.config();
    if args.yaml {
        println!();
        print!("{}", config.to_yaml().context("Failed to serialize config")?);
    } else {
        println!();
        println!("Configuration:");
        println!("  cache:            {}", on_off(config.cache_enabled));
        println!("  fast path:        {} (sigma >= {})", on_off(config.fast_enabled), config.fast_sigma_threshold);
        println!("  gpu:              {} (pixels >= {})", on_off(config.gpu_enabled), config.gpu_pixel_threshold);
        println!("  cache entries:    {}", config.max_cache_entries);
        println!("  cache memory:     {} MB", config.max_cache_memory_mb);
    }
    println!();
    println!("Workers: {} (default {})", WorkerPool::global().workers(), default_workers());
    Ok(())
}

fn on_off(v: bool) -> &'static str {
    if v { "on" } else { "off" }
}
