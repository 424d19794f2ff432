/*!
 * Heap Layout Tool
 *
 * Partitions a GPU address space and prints the resulting heaps as JSON.
 *
 * Usage:
 * - `heap-layout`              48-bit address space, root device 0 of 1
 * - `heap-layout BITS [I N]`   BITS-wide address space, root device I of N
 * - `heap-layout CONFIG.json`  full `PartitionConfig` read from a file
 *
 * Arena settings come from `GFX_HEAP_ALIGNMENT` / `GFX_HEAP_SIZE_THRESHOLD`
 * unless a config file provides them.
 */

use std::error::Error;
use tracing::info;

use gfx_heap::core::limits::max_n_bit_value;
use gfx_heap::{init_tracing, HeapConfig, HeapPartition, PartitionConfig};

fn parse_config(args: &[String]) -> Result<PartitionConfig, Box<dyn Error>> {
    let Some(first) = args.first() else {
        return Ok(PartitionConfig::default().with_heap_config(HeapConfig::from_env()));
    };

    if let Ok(bits) = first.parse::<u32>() {
        if bits == 0 || bits > 64 {
            return Err(format!("address width must be 1..=64 bits, got {}", bits).into());
        }
        let mut config =
            PartitionConfig::new(max_n_bit_value(bits)).with_heap_config(HeapConfig::from_env());
        if let [_, index, count, ..] = args {
            config = config.with_root_device(index.parse()?, count.parse()?);
        }
        return Ok(config);
    }

    let json = std::fs::read_to_string(first)?;
    Ok(serde_json::from_str(&json)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = parse_config(&args)?;
    info!(
        gpu_address_space = %format_args!("0x{:x}", config.gpu_address_space),
        root_device = config.root_device_index,
        num_root_devices = config.num_root_devices,
        "Partitioning GPU address space"
    );

    let partition = HeapPartition::init(&config)?;
    println!("{}", serde_json::to_string_pretty(&partition.layout())?);
    Ok(())
}
