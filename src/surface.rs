//! Surface classification under the reference wheel.

use serde::Serialize;

use crate::config::SurfaceConfig;
use crate::wheels::GroundHit;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceClass {
    #[default]
    Asphalt,
    Grass,
    Gravel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceSample {
    pub class: SurfaceClass,
    pub contact_valid: bool,
    pub on_grass: bool,
    pub on_gravel: bool,
}

/// Classify a single ground hit.
///
/// The grass and gravel tags are tested independently, so a contact carrying
/// both sets both flags. `class` then reports grass, which is what decides
/// lateral grip; the longitudinal overrides in the traction model look at the
/// flags themselves.
pub fn classify(hit: Option<&GroundHit>, tags: &SurfaceConfig) -> SurfaceSample {
    let Some(hit) = hit else {
        return SurfaceSample::default();
    };

    let on_grass = hit.has_tag(&tags.grass_tag);
    let on_gravel = hit.has_tag(&tags.gravel_tag);

    let class = if on_grass {
        SurfaceClass::Grass
    } else if on_gravel {
        SurfaceClass::Gravel
    } else {
        SurfaceClass::Asphalt
    };

    SurfaceSample {
        class,
        contact_valid: true,
        on_grass,
        on_gravel,
    }
}
