use {
    crate::{
        dataset::{self, Dataset, Payload},
        reader::{Content, ObjectReader},
        util::human_size,
        writer::{ObjectWriter, to_vec},
    },
    anyhow::{Context as _, bail},
    gamedebug_core::per,
    std::{
        fs::File,
        io::{BufWriter, Write},
        path::{Path, PathBuf},
    },
};

/// Which datasets a run operates on
#[derive(Debug, Default, Clone)]
pub struct Selection {
    /// Also operate on datasets that are not written by default
    pub include_inert: bool,
    /// Restrict to these labels. Empty means no restriction.
    pub only: Vec<String>,
}

impl Selection {
    /// The selected datasets in table order. Errors on labels that don't exist.
    pub fn datasets(&self) -> anyhow::Result<Vec<Dataset>> {
        if let Some(unknown) = self.only.iter().find(|label| dataset::find(label).is_none()) {
            bail!("Unknown dataset label: {unknown}");
        }
        Ok(dataset::table()
            .into_iter()
            .filter(|ds| {
                if self.only.is_empty() {
                    ds.persist || self.include_inert
                } else {
                    self.only.iter().any(|label| label == ds.label)
                }
            })
            .collect())
    }
}

/// Serialize a dataset into a complete stream
pub fn encode(ds: &Dataset) -> std::io::Result<Vec<u8>> {
    to_vec(|w| write_payload(w, &ds.payload))
}

fn write_payload<W: std::io::Write>(
    w: &mut ObjectWriter<W>,
    payload: &Payload,
) -> std::io::Result<()> {
    match payload {
        Payload::Array(arr) => w.write_prim_array(arr),
        Payload::Boxed(val) => w.write_boxed(*val),
    }
}

/// An artifact that was written to disk
#[derive(Debug)]
pub struct Emitted {
    pub label: &'static str,
    pub path: PathBuf,
    pub size: u64,
}

/// Write `dir/<label>.ser`, truncating any existing file.
///
/// The file is closed before this returns.
pub fn emit(ds: &Dataset, dir: &Path) -> anyhow::Result<Emitted> {
    let path = dir.join(ds.file_name());
    let file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    let writer = ObjectWriter::new(CountingWriter::new(BufWriter::new(file)))
        .and_then(|mut w| write_payload(&mut w, &ds.payload).map(|()| w))
        .and_then(ObjectWriter::finish)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    let size = writer.written;
    let file = writer
        .inner
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to close {}", path.display()))?;
    per!("Wrote {} ({})", path.display(), human_size(size));
    Ok(Emitted {
        label: ds.label,
        path,
        size,
    })
}

/// Keeps count of the bytes that went through it
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W> CountingWriter<W> {
    const fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Emit every selected dataset in order, stopping at the first failure
pub fn generate(dir: &Path, selection: &Selection) -> anyhow::Result<Vec<Emitted>> {
    selection
        .datasets()?
        .iter()
        .map(|ds| emit(ds, dir))
        .collect()
}

/// Outcome of checking one artifact against its dataset
#[derive(Debug)]
pub enum Check {
    Ok,
    Missing,
    Undecodable(String),
    Mismatch(String),
}

#[derive(Debug)]
pub struct Verified {
    pub label: &'static str,
    pub path: PathBuf,
    pub check: Check,
}

impl Verified {
    pub const fn is_ok(&self) -> bool {
        matches!(self.check, Check::Ok)
    }
}

impl std::fmt::Display for Verified {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:<24} ", self.label)?;
        match &self.check {
            Check::Ok => f.write_str("ok"),
            Check::Missing => write!(f, "missing: {}", self.path.display()),
            Check::Undecodable(msg) => write!(f, "undecodable: {}: {msg}", self.path.display()),
            Check::Mismatch(msg) => write!(f, "mismatch: {}: {msg}", self.path.display()),
        }
    }
}

/// Decode the artifact of every selected dataset in `dir` and compare it with the table
pub fn verify(dir: &Path, selection: &Selection) -> anyhow::Result<Vec<Verified>> {
    let mut results = Vec::new();
    for ds in selection.datasets()? {
        let path = dir.join(ds.file_name());
        let check = match std::fs::read(&path) {
            Ok(bytes) => check_bytes(&ds, &bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Check::Missing,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        per!("Verified {}: {check:?}", ds.label);
        results.push(Verified {
            label: ds.label,
            path,
            check,
        });
    }
    Ok(results)
}

/// Compare a serialized stream with what `ds` should produce
pub fn check_bytes(ds: &Dataset, bytes: &[u8]) -> Check {
    let contents = match ObjectReader::new(bytes).and_then(|mut r| r.read_all()) {
        Ok(contents) => contents,
        Err(e) => return Check::Undecodable(e.to_string()),
    };
    let [content] = contents.as_slice() else {
        return Check::Mismatch(format!(
            "expected one top level content, found {}",
            contents.len()
        ));
    };
    compare(&ds.payload, content)
}

fn compare(expected: &Payload, content: &Content) -> Check {
    match expected {
        Payload::Array(want) => {
            let Some(got) = content.as_prim_array() else {
                return Check::Mismatch(format!(
                    "expected {}[], found {}",
                    want.kind().label(),
                    content.type_label()
                ));
            };
            if got.kind() != want.kind() {
                return Check::Mismatch(format!(
                    "expected {}[], found {}[]",
                    want.kind().label(),
                    got.kind().label()
                ));
            }
            match want.first_difference(got) {
                None => Check::Ok,
                Some(_) if want.len() != got.len() => Check::Mismatch(format!(
                    "expected {} elements, found {}",
                    want.len(),
                    got.len()
                )),
                Some(idx) => Check::Mismatch(format!(
                    "element {idx}: expected {}, found {}",
                    want.get(idx).map_or_else(String::new, |v| v.to_string()),
                    got.get(idx).map_or_else(String::new, |v| v.to_string()),
                )),
            }
        }
        Payload::Boxed(want) => match content.as_boxed() {
            Some(got) if got == *want => Check::Ok,
            Some(got) => Check::Mismatch(format!("expected {want}, found {got}")),
            None => Check::Mismatch(format!(
                "expected boxed {}, found {}",
                want.kind().label(),
                content.type_label()
            )),
        },
    }
}

#[cfg(test)]
use crate::prim::{PrimArray, PrimValue};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
fn decode_file(path: &Path) -> Content {
    let bytes = std::fs::read(path).unwrap();
    let mut contents = crate::reader::from_slice(&bytes).unwrap();
    assert_eq!(contents.len(), 1);
    contents.remove(0)
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_generate_writes_every_persisted_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let emitted = generate(dir.path(), &Selection::default()).unwrap();
    assert_eq!(emitted.len(), 20);
    let table = dataset::table();
    for (em, ds) in emitted.iter().zip(table.iter().filter(|ds| ds.persist)) {
        assert_eq!(em.label, ds.label);
        let bytes = std::fs::read(&em.path).unwrap();
        assert_eq!(em.size, bytes.len() as u64, "{}", em.label);
        assert!(matches!(check_bytes(ds, &bytes), Check::Ok), "{}", em.label);
    }
    assert!(!dir.path().join("int_array_limits.ser").exists());
    let report = verify(dir.path(), &Selection::default()).unwrap();
    assert!(report.iter().all(|v| matches!(v.check, Check::Ok)));
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_boolean_mixed_and_short_limits_scenarios() {
    let dir = tempfile::tempdir().unwrap();
    let selection = Selection {
        include_inert: false,
        only: vec!["boolean_array_mixed".into(), "short_array_limits".into()],
    };
    let emitted = generate(dir.path(), &selection).unwrap();
    assert_eq!(emitted.len(), 2);
    let mixed = decode_file(&dir.path().join("boolean_array_mixed.ser"));
    assert_eq!(
        mixed.as_prim_array(),
        Some(&PrimArray::Boolean(vec![true, false, true, true, false]))
    );
    let limits = decode_file(&dir.path().join("short_array_limits.ser"));
    assert_eq!(
        limits.as_prim_array(),
        Some(&PrimArray::Short(vec![32767, 0, -32768]))
    );
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_wrapper_and_zero_filled_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let selection = Selection {
        include_inert: false,
        only: vec!["double_wrapper".into(), "short_array_new".into()],
    };
    generate(dir.path(), &selection).unwrap();
    let wrapper = decode_file(&dir.path().join("double_wrapper.ser"));
    assert_eq!(wrapper.as_boxed(), Some(PrimValue::Double(10.0)));
    let zeros = decode_file(&dir.path().join("short_array_new.ser"));
    let Some(PrimArray::Short(zeros)) = zeros.as_prim_array() else {
        panic!("short_array_new is not a short array");
    };
    assert_eq!(zeros.len(), 10000);
    assert!(zeros.iter().all(|&v| v == 0));
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_regeneration_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let selection = Selection {
        include_inert: true,
        only: Vec::new(),
    };
    let first = generate(dir.path(), &selection).unwrap();
    let before: Vec<Vec<u8>> = first
        .iter()
        .map(|em| std::fs::read(&em.path).unwrap())
        .collect();
    // Stale longer content must be truncated away
    std::fs::write(&first[0].path, vec![0xFF; 4096]).unwrap();
    let second = generate(dir.path(), &selection).unwrap();
    for (em, old) in second.iter().zip(&before) {
        assert_eq!(&std::fs::read(&em.path).unwrap(), old, "{}", em.label);
    }
    assert_eq!(before[0].len() as u64, first[0].size);
    for (em, ds) in second.iter().zip(&dataset::table()) {
        assert_eq!(std::fs::read(&em.path).unwrap(), encode(ds).unwrap());
    }
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_verify_reports_problems() {
    let dir = tempfile::tempdir().unwrap();
    let selection = Selection {
        include_inert: false,
        only: vec![
            "long_array_limits".into(),
            "byte_array_empty".into(),
            "double_array_limits".into(),
            "double_wrapper".into(),
        ],
    };
    generate(dir.path(), &selection).unwrap();
    // Wrong values in an otherwise valid stream
    let bogus =
        to_vec(|w| w.write_prim_array(&PrimArray::Long(vec![i64::MAX, i64::MIN, 1]))).unwrap();
    std::fs::write(dir.path().join("long_array_limits.ser"), bogus).unwrap();
    std::fs::remove_file(dir.path().join("byte_array_empty.ser")).unwrap();
    std::fs::write(dir.path().join("double_array_limits.ser"), b"garbage").unwrap();
    let wrong_box = to_vec(|w| w.write_boxed(PrimValue::Double(-10.0))).unwrap();
    std::fs::write(dir.path().join("double_wrapper.ser"), wrong_box).unwrap();

    let report = verify(dir.path(), &selection).unwrap();
    assert!(report.iter().all(|v| !v.is_ok()));
    let missing = dir.path().join("byte_array_empty.ser");
    assert_eq!(
        report[1].to_string(),
        format!("byte_array_empty         missing: {}", missing.display())
    );
    assert!(matches!(&report[0].check, Check::Undecodable(_)));
    assert!(matches!(&report[1].check, Check::Missing));
    assert!(matches!(&report[2].check, Check::Mismatch(msg) if msg.starts_with("element 2")));
    assert!(matches!(&report[3].check, Check::Mismatch(_)));
}

#[test]
fn test_unknown_label_is_rejected() {
    let selection = Selection {
        include_inert: false,
        only: vec!["int_array_bogus".into()],
    };
    assert!(selection.datasets().is_err());
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_emit_into_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does/not/exist");
    let err = generate(&missing, &Selection::default()).unwrap_err();
    assert!(err.to_string().contains("double_array_signed.ser"), "{err}");
}
