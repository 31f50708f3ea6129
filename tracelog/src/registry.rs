//! Module registry: uniform dispatch over the per-module codecs.
//!
//! Every module in a log is identified by a small integer id. The registry
//! maps ids to codec implementations behind one object-safe trait so that
//! generic tooling (the CLI's decode loop, the differ) can process a module
//! region without knowing which module it holds.
//!
//! The registry is a static table; modules cannot be registered at runtime.

use std::io::{self, Write};

use serde::Serialize;

use crate::error::{CodecError, Result};
use crate::lustre::{self, LustreRecord};
use crate::record::BaseRecord;
use crate::stdio::{self, StdioRecord};
use crate::stream::{ModuleReader, ModuleWriter};

/// Identifier of a known log module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[repr(u16)]
pub enum ModuleId {
    /// Buffered-stream I/O counters.
    Stdio = 1,
    /// Lustre file layout records.
    Lustre = 2,
}

impl ModuleId {
    /// All known modules, in id order.
    pub const ALL: [ModuleId; 2] = [ModuleId::Stdio, ModuleId::Lustre];

    /// The raw id stored in log headers.
    #[must_use]
    pub fn raw(self) -> u16 {
        self as u16
    }

    /// Maps a raw id back to a module.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownModule`] for unrecognized ids.
    pub fn from_raw(id: u16) -> Result<Self> {
        match id {
            1 => Ok(ModuleId::Stdio),
            2 => Ok(ModuleId::Lustre),
            _ => Err(CodecError::UnknownModule { id }.into()),
        }
    }

    /// The module's display name, as used in printed counter lines.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ModuleId::Stdio => "STDIO",
            ModuleId::Lustre => "LUSTRE",
        }
    }

    /// The format version this build writes for the module.
    #[must_use]
    pub fn current_version(self) -> u32 {
        match self {
            ModuleId::Stdio => stdio::STDIO_VER,
            ModuleId::Lustre => lustre::LUSTRE_VER,
        }
    }
}

/// A decoded record of any known module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "module", rename_all = "lowercase")]
pub enum ModuleRecord {
    /// An STDIO counter record.
    Stdio(StdioRecord),
    /// A Lustre layout record.
    Lustre(LustreRecord),
}

impl ModuleRecord {
    /// The module the record belongs to.
    #[must_use]
    pub fn module(&self) -> ModuleId {
        match self {
            ModuleRecord::Stdio(_) => ModuleId::Stdio,
            ModuleRecord::Lustre(_) => ModuleId::Lustre,
        }
    }

    /// The record's identity pair.
    #[must_use]
    pub fn base(&self) -> &BaseRecord {
        match self {
            ModuleRecord::Stdio(rec) => &rec.base,
            ModuleRecord::Lustre(rec) => &rec.base,
        }
    }
}

/// The uniform operation contract every module codec implements.
///
/// A codec only understands records of its own kind; handing it another
/// module's record is a deterministic [`CodecError::WrongRecordKind`],
/// never a panic or a silent skip.
pub trait ModuleCodec: Sync {
    /// The module this codec handles.
    fn module(&self) -> ModuleId;

    /// Decodes the next record, returning `Ok(None)` at end of data.
    ///
    /// # Errors
    ///
    /// Propagates the module codec's decode errors.
    fn decode(&self, reader: &mut dyn ModuleReader) -> Result<Option<ModuleRecord>>;

    /// Encodes a record in the module's current format version.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::WrongRecordKind`] for records of another
    /// module, plus the module codec's encode errors.
    fn encode(&self, writer: &mut dyn ModuleWriter, rec: &ModuleRecord) -> Result<()>;

    /// Prints every counter of a record, one line per counter.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::WrongRecordKind`] for records of another
    /// module, and output stream errors.
    fn print(&self, rec: &ModuleRecord, out: &mut dyn Write) -> Result<()>;

    /// Prints a fixed description of the module's counters.
    ///
    /// # Errors
    ///
    /// Returns output stream errors only.
    fn describe(&self, out: &mut dyn Write) -> Result<()>;

    /// Prints the difference between two records of this module.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::WrongRecordKind`] for records of another
    /// module, and output stream errors.
    fn diff(
        &self,
        left: Option<&ModuleRecord>,
        right: Option<&ModuleRecord>,
        out: &mut dyn Write,
    ) -> Result<()>;

    /// Folds a record into an accumulator of the same kind.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::WrongRecordKind`] when either side is a record
    /// of another module.
    fn aggregate(&self, rec: &ModuleRecord, accum: &mut ModuleRecord, init: bool) -> Result<()>;
}

/// Looks up the codec for a raw module id.
///
/// # Errors
///
/// Returns [`CodecError::UnknownModule`] for unrecognized ids.
pub fn lookup(id: u16) -> Result<&'static dyn ModuleCodec> {
    match ModuleId::from_raw(id)? {
        ModuleId::Stdio => Ok(&StdioCodec),
        ModuleId::Lustre => Ok(&LustreCodec),
    }
}

fn wrong_kind(own: ModuleId, rec: &ModuleRecord) -> CodecError {
    CodecError::WrongRecordKind {
        module: own.name(),
        found: rec.module().name(),
    }
}

fn io_err(source: io::Error) -> CodecError {
    CodecError::Io(source)
}

/// Codec for the STDIO module.
#[derive(Debug)]
pub struct StdioCodec;

impl StdioCodec {
    fn unwrap<'a>(&self, rec: &'a ModuleRecord) -> Result<&'a StdioRecord> {
        match rec {
            ModuleRecord::Stdio(rec) => Ok(rec),
            other => Err(wrong_kind(self.module(), other).into()),
        }
    }
}

impl ModuleCodec for StdioCodec {
    fn module(&self) -> ModuleId {
        ModuleId::Stdio
    }

    fn decode(&self, reader: &mut dyn ModuleReader) -> Result<Option<ModuleRecord>> {
        Ok(stdio::decode(reader)?.map(ModuleRecord::Stdio))
    }

    fn encode(&self, writer: &mut dyn ModuleWriter, rec: &ModuleRecord) -> Result<()> {
        stdio::encode(writer, self.unwrap(rec)?)
    }

    fn print(&self, rec: &ModuleRecord, out: &mut dyn Write) -> Result<()> {
        stdio::print(self.unwrap(rec)?, out).map_err(io_err)?;
        Ok(())
    }

    fn describe(&self, out: &mut dyn Write) -> Result<()> {
        stdio::describe(out).map_err(io_err)?;
        Ok(())
    }

    fn diff(
        &self,
        left: Option<&ModuleRecord>,
        right: Option<&ModuleRecord>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let left = left.map(|rec| self.unwrap(rec)).transpose()?;
        let right = right.map(|rec| self.unwrap(rec)).transpose()?;
        stdio::diff(left, right, out).map_err(io_err)?;
        Ok(())
    }

    fn aggregate(&self, rec: &ModuleRecord, accum: &mut ModuleRecord, init: bool) -> Result<()> {
        let rec = self.unwrap(rec)?;
        match accum {
            ModuleRecord::Stdio(accum) => {
                stdio::aggregate(rec, accum, init);
                Ok(())
            }
            other => Err(wrong_kind(self.module(), other).into()),
        }
    }
}

/// Codec for the LUSTRE module.
#[derive(Debug)]
pub struct LustreCodec;

impl LustreCodec {
    fn unwrap<'a>(&self, rec: &'a ModuleRecord) -> Result<&'a LustreRecord> {
        match rec {
            ModuleRecord::Lustre(rec) => Ok(rec),
            other => Err(wrong_kind(self.module(), other).into()),
        }
    }
}

impl ModuleCodec for LustreCodec {
    fn module(&self) -> ModuleId {
        ModuleId::Lustre
    }

    fn decode(&self, reader: &mut dyn ModuleReader) -> Result<Option<ModuleRecord>> {
        Ok(lustre::decode(reader)?.map(ModuleRecord::Lustre))
    }

    fn encode(&self, writer: &mut dyn ModuleWriter, rec: &ModuleRecord) -> Result<()> {
        lustre::encode(writer, self.unwrap(rec)?)
    }

    fn print(&self, rec: &ModuleRecord, out: &mut dyn Write) -> Result<()> {
        lustre::print(self.unwrap(rec)?, out).map_err(io_err)?;
        Ok(())
    }

    fn describe(&self, out: &mut dyn Write) -> Result<()> {
        lustre::describe(out).map_err(io_err)?;
        Ok(())
    }

    fn diff(
        &self,
        left: Option<&ModuleRecord>,
        right: Option<&ModuleRecord>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let left_rec = left.map(|rec| self.unwrap(rec)).transpose()?;
        let right_rec = right.map(|rec| self.unwrap(rec)).transpose()?;
        lustre::diff(left_rec, "", right_rec, "", out).map_err(io_err)?;
        Ok(())
    }

    fn aggregate(&self, rec: &ModuleRecord, accum: &mut ModuleRecord, init: bool) -> Result<()> {
        let rec = self.unwrap(rec)?;
        match accum {
            ModuleRecord::Lustre(accum) => {
                lustre::aggregate(rec, accum, init);
                Ok(())
            }
            other => Err(wrong_kind(self.module(), other).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{RecordSink, SliceReader};

    #[test]
    fn test_module_id_raw_round_trip() {
        for module in ModuleId::ALL {
            assert_eq!(ModuleId::from_raw(module.raw()).unwrap(), module);
        }
    }

    #[test]
    fn test_unknown_module_rejected() {
        for id in [0u16, 3, 999] {
            let err = ModuleId::from_raw(id).unwrap_err();
            assert!(err.to_string().contains("unknown module"));
            assert!(lookup(id).is_err());
        }
    }

    #[test]
    fn test_lookup_dispatches_by_id() {
        assert_eq!(lookup(1).unwrap().module(), ModuleId::Stdio);
        assert_eq!(lookup(2).unwrap().module(), ModuleId::Lustre);
    }

    #[test]
    fn test_generic_round_trip_through_codec() {
        let rec = ModuleRecord::Stdio(StdioRecord::new(BaseRecord { id: 9, rank: 1 }));
        let codec = lookup(ModuleId::Stdio.raw()).unwrap();

        let mut sink = RecordSink::new();
        codec.encode(&mut sink, &rec).unwrap();
        assert_eq!(sink.version(), Some(ModuleId::Stdio.current_version()));

        let decoded = codec.decode(&mut sink.as_reader()).unwrap().unwrap();
        assert_eq!(decoded, rec);
        assert_eq!(decoded.base().id, 9);
    }

    #[test]
    fn test_wrong_record_kind_rejected() {
        let stdio_rec = ModuleRecord::Stdio(StdioRecord::default());
        let lustre_codec = lookup(ModuleId::Lustre.raw()).unwrap();

        let mut sink = RecordSink::new();
        let err = lustre_codec.encode(&mut sink, &stdio_rec).unwrap_err();
        assert!(err.to_string().contains("LUSTRE codec got a STDIO record"));

        let mut out = Vec::new();
        assert!(lustre_codec.print(&stdio_rec, &mut out).is_err());
        assert!(
            lustre_codec
                .diff(Some(&stdio_rec), None, &mut out)
                .is_err()
        );

        let mut accum = ModuleRecord::Lustre(LustreRecord::default());
        let stdio_codec = lookup(ModuleId::Stdio.raw()).unwrap();
        let err = stdio_codec
            .aggregate(&ModuleRecord::Stdio(StdioRecord::default()), &mut accum, true)
            .unwrap_err();
        assert!(err.to_string().contains("STDIO codec got a LUSTRE record"));
    }

    #[test]
    fn test_decode_empty_stream_is_none() {
        for module in ModuleId::ALL {
            let codec = lookup(module.raw()).unwrap();
            let mut reader = SliceReader::new(&[], module.current_version());
            assert!(codec.decode(&mut reader).unwrap().is_none());
        }
    }

    #[test]
    fn test_describe_emits_module_header() {
        for module in ModuleId::ALL {
            let codec = lookup(module.raw()).unwrap();
            let mut out = Vec::new();
            codec.describe(&mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert!(text.contains(&format!("# description of {} counters:", module.name())));
        }
    }
}
