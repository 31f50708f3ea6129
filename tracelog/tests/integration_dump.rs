//! Integration tests driving the codecs through the registry over
//! on-disk module dumps.

use tracelog::dump::{MappedModule, ModuleDump};
use tracelog::lustre::{CompCounter, Component, LustreRecord};
use tracelog::record::BaseRecord;
use tracelog::registry::{self, ModuleId, ModuleRecord};
use tracelog::stdio::{StdioCounter, StdioRecord};
use tempfile::tempdir;

fn layout_record(id: u64, rank: i64) -> ModuleRecord {
    let mut comp = Component::new();
    comp.set_counter(CompCounter::StripeSize, 1 << 20);
    comp.set_counter(CompCounter::StripeCount, 4);
    comp.set_pool_name("nvme");

    let mut rec = LustreRecord::new(BaseRecord { id, rank });
    rec.push_component(comp, &[3, 5, 7, 9]).unwrap();
    ModuleRecord::Lustre(rec)
}

fn counter_record(id: u64, rank: i64, reads: i64) -> ModuleRecord {
    let mut rec = StdioRecord::new(BaseRecord { id, rank });
    rec.set_counter(StdioCounter::Reads, reads);
    rec.set_counter(StdioCounter::BytesRead, reads * 512);
    ModuleRecord::Stdio(rec)
}

/// Writes records through a codec into a dump, maps the file back, and
/// decodes until end of data.
#[test]
fn test_dump_file_round_trip_through_registry() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("lustre.dump");

    let records = vec![layout_record(100, 0), layout_record(101, 3)];
    let codec = registry::lookup(ModuleId::Lustre.raw()).unwrap();

    let mut dump = ModuleDump::create(&path, ModuleId::Lustre.raw());
    for rec in &records {
        codec.encode(&mut dump, rec).unwrap();
    }
    dump.finish().unwrap();

    let mut mapped = MappedModule::open(&path).unwrap();
    assert_eq!(mapped.module(), ModuleId::Lustre.raw());
    assert_eq!(mapped.version(), ModuleId::Lustre.current_version());

    let codec = registry::lookup(mapped.module()).unwrap();
    let mut decoded = Vec::new();
    while let Some(rec) = codec.decode(&mut mapped).unwrap() {
        decoded.push(rec);
    }
    assert_eq!(decoded, records);
}

#[test]
fn test_mixed_rank_stdio_dump_aggregates() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("stdio.dump");

    let codec = registry::lookup(ModuleId::Stdio.raw()).unwrap();
    let mut dump = ModuleDump::create(&path, ModuleId::Stdio.raw());
    for (rank, reads) in [(0, 10), (1, 20), (2, 30)] {
        codec
            .encode(&mut dump, &counter_record(500, rank, reads))
            .unwrap();
    }
    dump.finish().unwrap();

    let mut mapped = MappedModule::open(&path).unwrap();
    let mut accum = ModuleRecord::Stdio(StdioRecord::default());
    let mut first = true;
    while let Some(rec) = codec.decode(&mut mapped).unwrap() {
        codec.aggregate(&rec, &mut accum, first).unwrap();
        first = false;
    }

    let ModuleRecord::Stdio(accum) = accum else {
        panic!("stdio accumulator changed kind");
    };
    assert_eq!(accum.base.rank, tracelog::AGGREGATED_RANK);
    assert_eq!(accum.counter(StdioCounter::Reads), 60);
    assert_eq!(accum.counter(StdioCounter::BytesRead), 60 * 512);
}

/// A dump whose payload stops mid-record decodes up to the cut and then
/// fails deterministically.
#[test]
fn test_truncated_dump_payload_is_detected() {
    let temp_dir = tempdir().unwrap();
    let whole = temp_dir.path().join("whole.dump");
    let cut = temp_dir.path().join("cut.dump");

    let codec = registry::lookup(ModuleId::Lustre.raw()).unwrap();
    let mut dump = ModuleDump::create(&whole, ModuleId::Lustre.raw());
    codec.encode(&mut dump, &layout_record(1, 0)).unwrap();
    codec.encode(&mut dump, &layout_record(2, 0)).unwrap();
    dump.finish().unwrap();

    let bytes = std::fs::read(&whole).unwrap();
    std::fs::write(&cut, &bytes[..bytes.len() - 8]).unwrap();

    let mut mapped = MappedModule::open(&cut).unwrap();
    let first = codec.decode(&mut mapped).unwrap();
    assert_eq!(first, Some(layout_record(1, 0)));

    let err = codec.decode(&mut mapped).unwrap_err();
    assert!(err.to_string().contains("truncated"));
}

#[test]
fn test_unknown_module_dump_has_no_codec() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("mystery.dump");

    ModuleDump::create(&path, 77).finish().unwrap();

    let mapped = MappedModule::open(&path).unwrap();
    let Err(err) = registry::lookup(mapped.module()) else {
        panic!("module id 77 must not resolve to a codec");
    };
    assert!(err.to_string().contains("unknown module id 77"));
}
