use clap::{Args, Parser, Subcommand, value_parser};
use itertools::Itertools;
use std::str::FromStr;

use crate::rendering::culling::{
    DEFAULT_ADT_LOD0_DISTANCE, DEFAULT_LARGE_DOODAD_SIZE, DEFAULT_MAX_EXTERIOR_WMO_DISTANCE,
    DEFAULT_MAX_INTERIOR_WMO_DISTANCE,
};

#[derive(Parser, Debug)]
#[command(name = "Sargerust World")]
#[command(version = concat!(env!("VERGEN_GIT_BRANCH"), "/",env!("VERGEN_GIT_SHA")))]
#[command(about = "Streams, culls and animates World of Warcraft maps")]
pub struct CliArgs {
    /// Tiles within this Chebyshev distance of the camera are kept resident
    #[arg(long, default_value_t = 2, env = "SARGERUST_RADIUS")]
    pub radius: u8,

    /// Load every tile of the map up front instead of streaming around the camera
    #[arg(long)]
    pub eager: bool,

    #[arg(long, default_value_t = 120)]
    pub frames: u32,

    #[command(flatten)]
    pub scene: SceneSettings,

    #[command(subcommand)]
    pub operation_mode: OperationMode,
}

pub fn default_data_dir() -> String {
    std::env::current_dir()
        .expect("Can't read current working directory!")
        .join("_data")
        .to_string_lossy()
        .to_string()
}

#[derive(Subcommand, Debug)]
pub enum OperationMode {
    /// Renders a generated world through the headless backend
    Demo {
        /// Tiles per side of the generated map, starting at tile 0_0
        #[arg(long, default_value_t = 8)]
        grid: u8,
        #[arg(long, default_value_t = 5)]
        start_x: u8,
        #[arg(long, default_value_t = 5)]
        start_y: u8,
    },
    /// Renders assets that have been extracted into a directory
    Extracted {
        #[arg(long, env = "SARGERUST_DATA_DIR", default_value_t = default_data_dir())]
        data_dir: String,
        /// `id;path` lines
        #[arg(long, env = "SARGERUST_LISTFILE")]
        listfile: String,
        wdt_file_id: u32,
        #[arg(value_parser = value_parser!(Vector3))]
        coordinates: Vector3,
    },
}

/// The thresholds of the visibility culler. The defaults are what the game uses on medium view distance.
#[derive(Args, Debug, Copy, Clone, PartialEq)]
pub struct SceneSettings {
    /// Tiles closer than this use their detailed placements
    #[arg(long, default_value_t = DEFAULT_ADT_LOD0_DISTANCE)]
    pub adt_lod0_distance: f32,
    #[arg(long, default_value_t = DEFAULT_MAX_EXTERIOR_WMO_DISTANCE)]
    pub max_exterior_wmo_distance: f32,
    #[arg(long, default_value_t = DEFAULT_MAX_INTERIOR_WMO_DISTANCE)]
    pub max_interior_wmo_distance: f32,
    /// Doodads with a larger world space diagonal are also culled on their own
    #[arg(long, default_value_t = DEFAULT_LARGE_DOODAD_SIZE)]
    pub large_doodad_size: f32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        SceneSettings {
            adt_lod0_distance: DEFAULT_ADT_LOD0_DISTANCE,
            max_exterior_wmo_distance: DEFAULT_MAX_EXTERIOR_WMO_DISTANCE,
            max_interior_wmo_distance: DEFAULT_MAX_INTERIOR_WMO_DISTANCE,
            large_doodad_size: DEFAULT_LARGE_DOODAD_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vector3> for glam::Vec3 {
    fn from(value: Vector3) -> Self {
        glam::Vec3::new(value.x, value.y, value.z)
    }
}

fn trim_brackets(input: &str) -> &str {
    let mut chars = input.chars();
    chars.next(); // skip first
    chars.next_back(); // skip last
    chars.as_str()
}

impl FromStr for Vector3 {
    type Err = String;

    // (-a, b, c)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let string: String = s.chars().filter(|&c| !c.is_whitespace()).collect();
        if !string.starts_with('(') || !string.ends_with(')') {
            return Err("Missing start or end bracket".to_string());
        }

        let trimmed_str = trim_brackets(string.as_str());
        let splits = trimmed_str.split(',').collect_vec();

        if splits.len() != 3 {
            return Err(format!(
                "Comma splitting resulted in {} splits, not 3!",
                splits.len()
            ));
        }

        let components = splits
            .iter()
            .map(|&split| {
                split
                    .parse::<f32>()
                    .map_err(|err| format!("Failed to parse component {}: {}", split, err))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Vector3 {
            x: components[0],
            y: components[1],
            z: components[2],
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn vector3_parses_bracketed_triples() {
        let vector = Vector3::from_str("( -1.5, 2,3 )").expect("valid");
        assert_eq!(vector, Vector3 { x: -1.5, y: 2.0, z: 3.0 });

        assert!(Vector3::from_str("1, 2, 3").is_err());
        assert!(Vector3::from_str("(1, 2)").is_err());
        assert!(Vector3::from_str("(1, a, 3)").is_err());
    }

    #[test]
    fn scene_settings_default_to_the_cli_defaults() {
        let args = CliArgs::try_parse_from(["sargerust-world", "demo"]).expect("valid arguments");
        assert_eq!(args.scene, SceneSettings::default());
        assert_eq!(args.radius, 2);
        assert!(matches!(args.operation_mode, OperationMode::Demo { grid: 8, .. }));
    }
}
