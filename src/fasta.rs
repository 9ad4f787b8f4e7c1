use crate::error::{QcError, QcResult};
use crate::types::{HashMap, HashMapExt};
use needletail::parse_fastx_file;
use std::path::Path;
use tracing::debug;

/// Source of reference bases for GC sampling.
pub trait ReferenceSource {
    fn has_contig(&self, name: &str) -> bool;

    /// Bases of `name` over the 0-based, half-open range `[start, end)`.
    fn fetch(&self, name: &str, start: u64, end: u64) -> Option<Vec<u8>>;

    /// GC fraction of the range, `None` when the range holds no called base.
    fn gc_fraction(&self, name: &str, start: u64, end: u64) -> Option<f64> {
        self.fetch(name, start, end).and_then(|seq| gc_fraction(&seq))
    }
}

/// (G + C) / (A + C + G + T), ignoring ambiguous bases.
pub fn gc_fraction(seq: &[u8]) -> Option<f64> {
    let mut gc = 0usize;
    let mut called = 0usize;
    for b in seq {
        match b.to_ascii_uppercase() {
            b'G' | b'C' => {
                gc += 1;
                called += 1;
            }
            b'A' | b'T' => called += 1,
            _ => {}
        }
    }
    if called == 0 { None } else { Some(gc as f64 / called as f64) }
}

#[derive(Debug, Default)]
pub struct FastaDb {
    seqs: HashMap<String, Vec<u8>>,
}

impl FastaDb {
    pub fn load(path: &Path) -> QcResult<Self> {
        let mut reader = parse_fastx_file(path).map_err(|e| {
            QcError::Reference(format!("failed to open FASTA {}: {}", path.display(), e))
        })?;
        let mut seqs: HashMap<String, Vec<u8>> = HashMap::new();

        while let Some(result) = reader.next() {
            let record = result
                .map_err(|e| QcError::Reference(format!("failed to parse FASTA record: {}", e)))?;
            // Keep the name up to the first whitespace, as BAM headers do.
            let name = std::str::from_utf8(record.id())
                .unwrap_or("")
                .split_whitespace()
                .next()
                .unwrap_or("")
                .to_string();
            let seq = record.seq().to_vec();
            debug!(contig = %name, length = seq.len(), "loaded reference contig");
            seqs.insert(name, seq);
        }

        Ok(Self { seqs })
    }

    pub fn from_sequences<I>(seqs: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let mut map = HashMap::new();
        for (name, seq) in seqs {
            map.insert(name, seq);
        }
        Self { seqs: map }
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }
}

impl ReferenceSource for FastaDb {
    fn has_contig(&self, name: &str) -> bool {
        self.seqs.contains_key(name)
    }

    fn fetch(&self, name: &str, start: u64, end: u64) -> Option<Vec<u8>> {
        let seq = self.seqs.get(name)?;
        let s = start as usize;
        let e = (end as usize).min(seq.len());
        if s < e {
            Some(seq[s..e].to_ascii_uppercase())
        } else {
            None
        }
    }
}
