/*!
A packaged classifier artifact: the model graph plus the class table
it was trained against, in one binary container.

```text
magic    "MVCA"
version  u8
flags    u8   bit 0: data is snappy-compressed
kind     u8   0: detect, 1: single-view, 2: multi-view
backend  u8   1: ONNX, 2: NNEF
classes  u32 LE count, then per class a u32 LE length and UTF-8 bytes
data     remaining bytes
```

Artifacts that aren't on disk yet can be downloaded with [`fetch`].
*/

use anyhow::{bail, Context, Result};
use mvclass_core::prelude::{
    ClassTable, Inferer, InfererBuilder, InfererProvider, MemoizingInferer, ModelApi, ModelKind,
};
use std::io::{Cursor, Read, Write};

pub mod fetch;

pub const VERSION: u8 = 1;

/// Magic used to ensure assets are valid.
pub const MAGIC: [u8; 4] = [b'M', b'V', b'C', b'A'];

const FLAG_COMPRESSED: u8 = 0b0000_0001;

/// AssetKind denotes what kind of graph is contained inside an [`AssetData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AssetKind {
    /// Used for an asset containing ONNX ModelProto data.
    Onnx = 1,

    /// Used for an asset containing NNEF data.
    Nnef = 2,
}

impl TryFrom<u8> for AssetKind {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AssetKind::Onnx),
            2 => Ok(AssetKind::Nnef),
            v => bail!("unexpected asset kind: {:?}", v),
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Onnx => f.pad("onnx"),
            AssetKind::Nnef => f.pad("nnef"),
        }
    }
}

/// Contains a tagged buffer of model data and its class table.
#[derive(Debug, Clone)]
pub struct AssetData {
    kind: AssetKind,
    model_kind: Option<ModelKind>,
    classes: ClassTable,
    data: Vec<u8>,
    compressed: bool,
}

fn read_array<const N: usize>(reader: &mut impl Read, what: &str) -> Result<[u8; N]> {
    let mut buf = [0; N];
    reader
        .read_exact(&mut buf)
        .with_context(|| format!("too few bytes available reading {what}, expected {N}"))?;
    Ok(buf)
}

fn read_u32(reader: &mut impl Read, what: &str) -> Result<u32> {
    Ok(u32::from_le_bytes(read_array::<4>(reader, what)?))
}

impl AssetData {
    /// Create a new AssetData from parts.
    ///
    /// Note: Does not validate the model data.
    pub fn new<Data: Into<Vec<u8>>>(
        kind: AssetKind,
        model_kind: Option<ModelKind>,
        classes: ClassTable,
        data: Data,
    ) -> Self {
        Self {
            kind,
            model_kind,
            classes,
            data: data.into(),
            compressed: false,
        }
    }

    /// Create a new AssetData from a reader and a kind.
    ///
    /// Note: Does not validate the model data.
    pub fn from_reader<Reader: Read>(
        kind: AssetKind,
        model_kind: Option<ModelKind>,
        classes: ClassTable,
        mut reader: Reader,
    ) -> Result<Self> {
        let mut buf = vec![];
        reader.read_to_end(&mut buf)?;

        Ok(Self::new(kind, model_kind, classes, buf))
    }

    /// Deserialize from raw bytes.
    ///
    /// Validates the header and class table; the model data itself is
    /// only checked when creating an inferer.
    pub fn deserialize(mut reader: impl Read) -> Result<Self> {
        let magic = read_array::<4>(&mut reader, "magic")?;
        if magic != MAGIC {
            bail!(
                "unexpected magic: expected 'MVCA' found {}{}{}{}",
                magic[0] as char,
                magic[1] as char,
                magic[2] as char,
                magic[3] as char
            );
        }

        let [version, flags, kind, backend] = read_array::<4>(&mut reader, "preamble")?;
        if version != VERSION {
            bail!("unsupported asset version {}, expected {}", version, VERSION);
        }

        if flags & !FLAG_COMPRESSED != 0 {
            bail!("unexpected reserved flag bits set: {:#010b}", flags);
        }

        let model_kind = match kind {
            0 => None,
            code => Some(
                ModelKind::from_code(code)
                    .with_context(|| format!("unexpected model kind: {:?}", code))?,
            ),
        };

        let backend = AssetKind::try_from(backend)?;

        let count = read_u32(&mut reader, "class count")?;
        let mut names = Vec::with_capacity(count.min(4096) as usize);
        for idx in 0..count {
            let len = read_u32(&mut reader, "class name length")? as usize;
            let mut raw = vec![];
            (&mut reader)
                .take(len as u64)
                .read_to_end(&mut raw)
                .with_context(|| format!("reading name for class {idx}"))?;
            if raw.len() != len {
                bail!(
                    "truncated name for class {idx}: expected {len} bytes, found {}",
                    raw.len()
                );
            }
            names.push(
                String::from_utf8(raw).with_context(|| format!("class {idx} is not valid UTF-8"))?,
            );
        }

        let classes = ClassTable::new(names)?;

        let mut data = vec![];
        reader.read_to_end(&mut data)?;

        let compressed = flags & FLAG_COMPRESSED != 0;
        if compressed {
            let mut d = snap::read::FrameDecoder::new(Cursor::new(data));
            data = vec![];
            d.read_to_end(&mut data)?;
        }

        Ok(Self {
            kind: backend,
            model_kind,
            classes,
            data,
            compressed,
        })
    }

    /// Serialize to raw bytes.
    ///
    /// If compression is enabled the model data is written as a snappy
    /// frame stream. The buffer returned will not contain any extra
    /// unused bytes.
    pub fn serialize(&self, compress: bool) -> Result<Vec<u8>> {
        let mut output = vec![];
        output.write_all(&MAGIC)?;

        let flags: u8 = if compress { FLAG_COMPRESSED } else { 0 };
        let kind = self.model_kind.map_or(0, ModelKind::code);
        output.write_all(&[VERSION, flags, kind, self.kind as u8])?;

        output.write_all(&(self.classes.len() as u32).to_le_bytes())?;
        for name in self.classes.iter() {
            output.write_all(&(name.len() as u32).to_le_bytes())?;
            output.write_all(name.as_bytes())?;
        }

        if compress {
            let mut d = snap::write::FrameEncoder::new(&mut output);
            d.write_all(&self.data)?;
            d.flush()?;
        } else {
            output.extend(&self.data);
        }

        output.shrink_to_fit();

        Ok(output)
    }

    /// Get the backend kind of this asset.
    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// The declared model kind, or `None` when it is detected on load.
    pub fn model_kind(&self) -> Option<ModelKind> {
        self.model_kind
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    /// Get the (uncompressed) model data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the asset was stored compressed when it was deserialized.
    pub fn was_compressed(&self) -> bool {
        self.compressed
    }

    /// Load a shape-memoizing inferer from this asset.
    ///
    /// See [`MemoizingInferer`] for more details.
    pub fn load_memoizing(&self) -> Result<MemoizingInferer> {
        let cursor = Cursor::new(&self.data);
        match self.kind {
            AssetKind::Onnx => build(mvclass_onnx::builder(cursor), self.model_kind),
            AssetKind::Nnef => build(mvclass_nnef::builder(cursor), self.model_kind),
        }
    }

    /// Describe the declared inputs and outputs of the contained graph.
    pub fn describe(&self) -> Result<ModelApi> {
        let mut cursor = Cursor::new(&self.data);
        match self.kind {
            AssetKind::Onnx => mvclass_onnx::describe(&mut cursor),
            AssetKind::Nnef => mvclass_nnef::describe(&mut cursor),
        }
    }
}

fn build<P: InfererProvider>(
    builder: InfererBuilder<P>,
    kind: Option<ModelKind>,
) -> Result<MemoizingInferer> {
    let inferer = builder.with_kind(kind).build_memoizing()?;
    log::debug!("built memoizing inferer for {} model", inferer.kind());
    Ok(inferer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> ClassTable {
        ClassTable::new(vec!["coupling".into(), "elbow".into(), "tee".into()]).unwrap()
    }

    #[test]
    fn header_layout() {
        let asset = AssetData::new(
            AssetKind::Nnef,
            Some(ModelKind::MultiView),
            classes(),
            vec![9u8, 9],
        );
        let bytes = asset.serialize(false).unwrap();

        assert_eq!(&bytes[..4], b"MVCA");
        assert_eq!(&bytes[4..8], &[1, 0, 2, 2]);
        assert_eq!(&bytes[8..12], &3u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &8u32.to_le_bytes());
        assert_eq!(&bytes[16..24], b"coupling");
        assert_eq!(&bytes[bytes.len() - 2..], &[9, 9]);
    }

    #[test]
    fn rejects_reserved_flags() {
        let asset = AssetData::new(AssetKind::Onnx, None, classes(), vec![1u8]);
        let mut bytes = asset.serialize(false).unwrap();
        bytes[5] = 0b10;

        assert!(AssetData::deserialize(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn rejects_unknown_codes() {
        let asset = AssetData::new(AssetKind::Onnx, None, classes(), vec![1u8]);
        let bytes = asset.serialize(false).unwrap();

        let mut bad_kind = bytes.clone();
        bad_kind[6] = 7;
        assert!(AssetData::deserialize(Cursor::new(bad_kind)).is_err());

        let mut bad_backend = bytes;
        bad_backend[7] = 0;
        assert!(AssetData::deserialize(Cursor::new(bad_backend)).is_err());
    }

    #[test]
    fn rejects_empty_class_table() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend([VERSION, 0, 0, 1]);
        bytes.extend(0u32.to_le_bytes());

        assert!(AssetData::deserialize(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn oversized_name_length_is_truncation() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend([VERSION, 0, 0, 1]);
        bytes.extend(1u32.to_le_bytes());
        bytes.extend(u32::MAX.to_le_bytes());
        bytes.extend(b"tee");

        let err = AssetData::deserialize(Cursor::new(bytes)).unwrap_err();
        assert!(err.to_string().contains("truncated name for class 0"), "{err}");
    }

    #[test]
    fn rejects_invalid_utf8() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend([VERSION, 0, 0, 1]);
        bytes.extend(1u32.to_le_bytes());
        bytes.extend(2u32.to_le_bytes());
        bytes.extend([0xff, 0xfe]);

        assert!(AssetData::deserialize(Cursor::new(bytes)).is_err());
    }
}
