//! Per-version capabilities of the container format.
//!
//! Every [`ModelVersion`] has one entry in [`STRATEGY_TABLE`] saying which
//! constructs that version can store. Writers consult it to gate optional
//! sections and to refuse downgrades that would lose data.

use encoding_rs::Encoding;

use crate::collections::CollectionManager;
use crate::entities::{DefinitionKind, EntityType};
use crate::error::{ModelError, Result};
use crate::model::Model;
use crate::types::ModelVersion;

/// What one format version can encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionStrategy {
    pub version: ModelVersion,
    /// Body may be zlib-compressed
    pub compressed_body: bool,
    /// Text is UTF-8; older versions use Windows-1252
    pub unicode_text: bool,
    pub match_photo_scenes: bool,
    pub georeference: bool,
    pub classifications: bool,
    pub fonts: bool,
    /// Image entities and image definitions
    pub image_definitions: bool,
    /// Active layer is stored; readers of older versions use the default layer
    pub active_layer: bool,
}

impl VersionStrategy {
    const fn derive(version: ModelVersion) -> Self {
        let tag = version as u16;
        VersionStrategy {
            version,
            compressed_body: tag >= ModelVersion::SU2013 as u16,
            unicode_text: tag >= ModelVersion::SU2013 as u16,
            match_photo_scenes: tag >= ModelVersion::SU7 as u16,
            georeference: tag >= ModelVersion::SU4 as u16,
            classifications: tag >= ModelVersion::SU2014 as u16,
            fonts: tag >= ModelVersion::SU2017 as u16,
            image_definitions: tag >= ModelVersion::SU2019 as u16,
            active_layer: tag >= ModelVersion::SU2020 as u16,
        }
    }

    /// Table entry for a version
    pub fn for_version(version: ModelVersion) -> &'static VersionStrategy {
        let index = ModelVersion::ALL
            .iter()
            .position(|v| *v == version)
            .unwrap_or(STRATEGY_TABLE.len() - 1);
        &STRATEGY_TABLE[index]
    }

    /// Text encoding of string fields
    pub fn encoding(&self) -> &'static Encoding {
        if self.unicode_text {
            encoding_rs::UTF_8
        } else {
            encoding_rs::WINDOWS_1252
        }
    }

    /// Fail with `ModelVersion` if `model` uses anything this version
    /// cannot store.
    ///
    /// Text that the legacy encoding cannot represent is caught later, while
    /// strings are encoded.
    pub fn check_model(&self, model: &Model) -> Result<()> {
        let lacks = |what: &str| {
            Err(ModelError::ModelVersion(format!(
                "{} cannot store {what}",
                self.version
            )))
        };

        if !self.georeference && model.is_geo_referenced() {
            return lacks("a georeferenced location");
        }
        if !self.classifications && !model.classifications().is_empty() {
            return lacks("classification schemas");
        }
        if !self.fonts && model.num_fonts() > 0 {
            return lacks("fonts");
        }
        if !self.match_photo_scenes {
            let photo = model.scenes.collection().iter().any(|pid| {
                model
                    .registry
                    .get(pid)
                    .and_then(EntityType::as_scene)
                    .is_some_and(|s| s.is_match_photo())
            });
            if photo {
                return lacks("match-photo scenes");
            }
        }
        if !self.image_definitions {
            let images = model.registry.iter().any(|(_, e)| {
                matches!(e, EntityType::Image(_))
                    || e
                        .as_definition()
                        .is_some_and(|d| d.kind == DefinitionKind::Image)
            });
            if images {
                return lacks("images");
            }
        }
        Ok(())
    }
}

/// One entry per format version, oldest first
pub static STRATEGY_TABLE: [VersionStrategy; 14] = [
    VersionStrategy::derive(ModelVersion::SU3),
    VersionStrategy::derive(ModelVersion::SU4),
    VersionStrategy::derive(ModelVersion::SU5),
    VersionStrategy::derive(ModelVersion::SU6),
    VersionStrategy::derive(ModelVersion::SU7),
    VersionStrategy::derive(ModelVersion::SU8),
    VersionStrategy::derive(ModelVersion::SU2013),
    VersionStrategy::derive(ModelVersion::SU2014),
    VersionStrategy::derive(ModelVersion::SU2015),
    VersionStrategy::derive(ModelVersion::SU2016),
    VersionStrategy::derive(ModelVersion::SU2017),
    VersionStrategy::derive(ModelVersion::SU2018),
    VersionStrategy::derive(ModelVersion::SU2019),
    VersionStrategy::derive(ModelVersion::SU2020),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_table_matches_versions() {
        for (entry, version) in STRATEGY_TABLE.iter().zip(ModelVersion::ALL) {
            assert_eq!(entry.version, version);
            assert_eq!(VersionStrategy::for_version(version), entry);
        }
    }

    #[test]
    fn test_feature_gates() {
        let su8 = VersionStrategy::for_version(ModelVersion::SU8);
        assert!(!su8.unicode_text);
        assert!(su8.match_photo_scenes);
        assert_eq!(su8.encoding(), encoding_rs::WINDOWS_1252);

        let su2017 = VersionStrategy::for_version(ModelVersion::SU2017);
        assert!(su2017.fonts && su2017.classifications);
        assert!(!su2017.image_definitions);
        assert!(!su2017.active_layer);
    }

    #[test]
    fn test_check_model_rejects_fonts_before_2017() {
        let mut model = Model::new();
        model.create_font("Arial", false, false);
        assert_eq!(model.fonts.count(), 1);

        let err = VersionStrategy::for_version(ModelVersion::SU2016)
            .check_model(&model)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelVersion);
        assert!(VersionStrategy::for_version(ModelVersion::SU2017)
            .check_model(&model)
            .is_ok());
    }
}
