use crate::core::mapping::CorrespondenceMap;
use crate::domain::model::{Axis, CorrespondenceEntry, Provenance};
use crate::utils::error::{RbsyncError, Result};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const TABULAR_HEADER: [&str; 2] = ["Source_Slice_Index", "Target_Slice_Index"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingFormat {
    Json,
    Csv,
}

impl MappingFormat {
    pub fn extension(self) -> &'static str {
        match self {
            MappingFormat::Json => "json",
            MappingFormat::Csv => "csv",
        }
    }

    pub fn default_file_name(self) -> &'static str {
        match self {
            MappingFormat::Json => "slice_mapping.json",
            MappingFormat::Csv => "slice_mapping.csv",
        }
    }

}

impl FromStr for MappingFormat {
    type Err = RbsyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(MappingFormat::Json),
            "csv" => Ok(MappingFormat::Csv),
            other => Err(RbsyncError::invalid_input(format!(
                "unsupported mapping format '{}', expected json or csv",
                other
            ))),
        }
    }
}

impl fmt::Display for MappingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Context written next to the mapping in the structured format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingMetadata {
    pub axis: Axis,
    pub source_shape: Option<[usize; 3]>,
    pub target_shape: Option<[usize; 3]>,
}

/// On-disk layout of the structured export. Provenance is not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDocument {
    pub axis: i64,
    pub axis_name: String,
    pub source_shape: Option<[usize; 3]>,
    pub target_shape: Option<[usize; 3]>,
    #[serde(deserialize_with = "unique_entries")]
    pub mapping: BTreeMap<usize, usize>,
}

// A JSON object may repeat a key; a repeated source slice is rejected
// instead of letting the last value win.
fn unique_entries<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<usize, usize>, D::Error>
where
    D: Deserializer<'de>,
{
    struct UniqueEntries;

    impl<'de> Visitor<'de> for UniqueEntries {
        type Value = BTreeMap<usize, usize>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object of source slice to target slice")
        }

        fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut mapping = BTreeMap::new();
            while let Some((source, target)) = access.next_entry::<usize, usize>()? {
                if mapping.insert(source, target).is_some() {
                    return Err(de::Error::custom(format!(
                        "source slice {} appears more than once",
                        source
                    )));
                }
            }
            Ok(mapping)
        }
    }

    deserializer.deserialize_map(UniqueEntries)
}

impl MappingDocument {
    pub fn new(map: &CorrespondenceMap, metadata: &MappingMetadata) -> Self {
        Self {
            axis: metadata.axis.index() as i64,
            axis_name: metadata.axis.name().to_string(),
            source_shape: metadata.source_shape,
            target_shape: metadata.target_shape,
            mapping: map.resolved(),
        }
    }

    /// Checks the document is self-consistent and turns it back into a map.
    /// Every entry comes back as manual.
    pub fn into_parts(self) -> Result<(MappingMetadata, CorrespondenceMap)> {
        let axis = Axis::try_from(self.axis)?;
        if !axis.name().eq_ignore_ascii_case(&self.axis_name) {
            return Err(RbsyncError::invalid_input(format!(
                "axis_name '{}' does not match axis {}",
                self.axis_name, self.axis
            )));
        }
        if self.mapping.is_empty() {
            return Err(RbsyncError::EmptyMapping);
        }
        if let Some(shape) = self.target_shape {
            let count = shape[axis.index()];
            if let Some((source, target)) = self.mapping.iter().find(|(_, &t)| t >= count) {
                return Err(RbsyncError::invalid_input(format!(
                    "source slice {} maps to target slice {}, but the target has {} slices along {}",
                    source, target, count, axis
                )));
            }
        }

        let map = self
            .mapping
            .into_iter()
            .map(|(source, target)| (source, CorrespondenceEntry::manual(target)))
            .collect();
        let metadata = MappingMetadata {
            axis,
            source_shape: self.source_shape,
            target_shape: self.target_shape,
        };
        Ok((metadata, map))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TabularRow {
    #[serde(rename = "Source_Slice_Index")]
    source: usize,
    #[serde(rename = "Target_Slice_Index")]
    target: usize,
}

/// JSON and CSV encodings of a [`CorrespondenceMap`].
pub struct MappingCodec;

impl MappingCodec {
    pub fn encode(
        format: MappingFormat,
        map: &CorrespondenceMap,
        metadata: &MappingMetadata,
    ) -> Result<String> {
        match format {
            MappingFormat::Json => Self::encode_structured(map, metadata),
            MappingFormat::Csv => Self::encode_tabular(map),
        }
    }

    pub fn encode_structured(map: &CorrespondenceMap, metadata: &MappingMetadata) -> Result<String> {
        if map.is_empty() {
            return Err(RbsyncError::EmptyMapping);
        }
        let document = MappingDocument::new(map, metadata);
        Ok(serde_json::to_string_pretty(&document)?)
    }

    pub fn encode_tabular(map: &CorrespondenceMap) -> Result<String> {
        if map.is_empty() {
            return Err(RbsyncError::EmptyMapping);
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(TABULAR_HEADER)?;
        for (source, entry) in map.iter() {
            writer.serialize(TabularRow {
                source,
                target: entry.target_index,
            })?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| RbsyncError::format(e.to_string()))
    }

    pub fn decode_structured(content: &str) -> Result<(MappingMetadata, CorrespondenceMap)> {
        let document: MappingDocument = serde_json::from_str(content)?;
        document.into_parts()
    }

    /// The tabular format carries no metadata, so only the map comes back.
    pub fn decode_tabular(content: &str) -> Result<CorrespondenceMap> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = reader.headers()?.clone();
        if headers.iter().ne(TABULAR_HEADER.iter().copied()) {
            return Err(RbsyncError::format(format!(
                "expected header {:?}, found {:?}",
                TABULAR_HEADER,
                headers.iter().collect::<Vec<_>>()
            )));
        }

        let mut map = CorrespondenceMap::new();
        for row in reader.deserialize::<TabularRow>() {
            let row = row?;
            if map.contains(row.source) {
                return Err(RbsyncError::format(format!(
                    "source slice {} appears more than once",
                    row.source
                )));
            }
            map.set(row.source, row.target, Provenance::Manual);
        }

        if map.is_empty() {
            return Err(RbsyncError::EmptyMapping);
        }
        Ok(map)
    }

    pub fn write(
        format: MappingFormat,
        path: impl AsRef<Path>,
        map: &CorrespondenceMap,
        metadata: &MappingMetadata,
    ) -> Result<()> {
        let path = path.as_ref();
        let content = Self::encode(format, map, metadata)?;
        std::fs::write(path, content).map_err(|e| RbsyncError::io(path, e))?;
        tracing::info!("Exported {} correspondences to {}", map.len(), path.display());
        Ok(())
    }

    pub fn read(
        format: MappingFormat,
        path: impl AsRef<Path>,
    ) -> Result<(Option<MappingMetadata>, CorrespondenceMap)> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| RbsyncError::io(path, e))?;
        match format {
            MappingFormat::Json => {
                let (metadata, map) = Self::decode_structured(&content)?;
                Ok((Some(metadata), map))
            }
            MappingFormat::Csv => Ok((None, Self::decode_tabular(&content)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn si_metadata() -> MappingMetadata {
        MappingMetadata {
            axis: Axis::SuperiorInferior,
            source_shape: Some([10, 10, 6]),
            target_shape: Some([10, 10, 40]),
        }
    }

    #[test]
    fn test_encode_tabular_single_entry() {
        let mut map = CorrespondenceMap::new();
        map.set(0, 24, Provenance::Auto);

        let csv = MappingCodec::encode_tabular(&map).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec!["Source_Slice_Index,Target_Slice_Index", "0,24"]);
    }

    #[test]
    fn test_encode_tabular_orders_by_source() {
        let mut map = CorrespondenceMap::new();
        map.set(4, 32, Provenance::Manual);
        map.set(1, 8, Provenance::Auto);
        map.set(2, 16, Provenance::Auto);

        let csv = MappingCodec::encode_tabular(&map).unwrap();
        assert_eq!(
            csv,
            "Source_Slice_Index,Target_Slice_Index\n1,8\n2,16\n4,32\n"
        );
    }

    #[test]
    fn test_encode_empty_map_fails() {
        let map = CorrespondenceMap::new();
        assert!(matches!(
            MappingCodec::encode_tabular(&map),
            Err(RbsyncError::EmptyMapping)
        ));
        assert!(matches!(
            MappingCodec::encode_structured(&map, &si_metadata()),
            Err(RbsyncError::EmptyMapping)
        ));
    }

    #[test]
    fn test_encode_structured_layout() {
        let mut map = CorrespondenceMap::new();
        map.set(3, 24, Provenance::Manual);
        map.set(0, 0, Provenance::Auto);

        let json = MappingCodec::encode_structured(&map, &si_metadata()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "axis": 2,
                "axis_name": "SI",
                "source_shape": [10, 10, 6],
                "target_shape": [10, 10, 40],
                "mapping": {"0": 0, "3": 24}
            })
        );
        assert!(json.starts_with("{\n  \"axis\": 2,"));
    }

    #[test]
    fn test_encode_structured_without_volumes() {
        let mut map = CorrespondenceMap::new();
        map.set(1, 2, Provenance::Auto);
        let metadata = MappingMetadata {
            axis: Axis::LeftRight,
            source_shape: None,
            target_shape: None,
        };
        let json = MappingCodec::encode_structured(&map, &metadata).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["source_shape"].is_null());
        assert!(value["target_shape"].is_null());
        assert_eq!(value["axis_name"], "LR");
    }

    #[test]
    fn test_decode_structured_restores_manual_entries() {
        let mut map = CorrespondenceMap::new();
        map.set(0, 0, Provenance::Auto);
        map.set(3, 24, Provenance::Auto);
        let json = MappingCodec::encode_structured(&map, &si_metadata()).unwrap();

        let (metadata, decoded) = MappingCodec::decode_structured(&json).unwrap();
        assert_eq!(metadata, si_metadata());
        assert_eq!(decoded.resolved(), map.resolved());
        assert_eq!(decoded.manual_count(), 2);
    }

    #[test]
    fn test_decode_structured_rejects_inconsistent_axis() {
        let json = r#"{"axis": 2, "axis_name": "AP", "source_shape": null,
                       "target_shape": null, "mapping": {"0": 1}}"#;
        assert!(matches!(
            MappingCodec::decode_structured(json),
            Err(RbsyncError::InvalidInput { .. })
        ));

        for axis in ["5", "-1"] {
            let json = format!(
                r#"{{"axis": {}, "axis_name": "SI", "source_shape": null,
                    "target_shape": null, "mapping": {{"0": 1}}}}"#,
                axis
            );
            assert!(matches!(
                MappingCodec::decode_structured(&json),
                Err(RbsyncError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn test_decode_structured_rejects_repeated_source_slice() {
        let json = r#"{"axis": 2, "axis_name": "SI", "source_shape": null,
                       "target_shape": null, "mapping": {"0": 1, "0": 7}}"#;
        match MappingCodec::decode_structured(json) {
            Err(RbsyncError::Serialization(e)) => {
                assert!(e.to_string().contains("source slice 0 appears more than once"))
            }
            other => panic!("expected Serialization error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_structured_rejects_out_of_range_target() {
        let json = r#"{"axis": 2, "axis_name": "SI", "source_shape": [10, 10, 6],
                       "target_shape": [10, 10, 40], "mapping": {"0": 40}}"#;
        assert!(matches!(
            MappingCodec::decode_structured(json),
            Err(RbsyncError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_decode_structured_rejects_garbage() {
        assert!(matches!(
            MappingCodec::decode_structured("not json"),
            Err(RbsyncError::Serialization(_))
        ));
    }

    #[test]
    fn test_decode_tabular() {
        let csv = "Source_Slice_Index,Target_Slice_Index\n0,24\n2,30\n";
        let map = MappingCodec::decode_tabular(csv).unwrap();
        assert_eq!(map.get(0), Some(CorrespondenceEntry::manual(24)));
        assert_eq!(map.get(2), Some(CorrespondenceEntry::manual(30)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_decode_tabular_rejects_bad_header_and_duplicates() {
        let wrong_header = "MRI_Slice_Index,Atlas_Slice_Index\n0,24\n";
        assert!(matches!(
            MappingCodec::decode_tabular(wrong_header),
            Err(RbsyncError::Format { .. })
        ));

        let duplicate = "Source_Slice_Index,Target_Slice_Index\n0,24\n0,25\n";
        assert!(matches!(
            MappingCodec::decode_tabular(duplicate),
            Err(RbsyncError::Format { .. })
        ));

        let header_only = "Source_Slice_Index,Target_Slice_Index\n";
        assert!(matches!(
            MappingCodec::decode_tabular(header_only),
            Err(RbsyncError::EmptyMapping)
        ));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<MappingFormat>().unwrap(), MappingFormat::Json);
        assert_eq!(" csv ".parse::<MappingFormat>().unwrap(), MappingFormat::Csv);
        assert!("tsv".parse::<MappingFormat>().is_err());
    }
}
