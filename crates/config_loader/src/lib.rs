//! 读取雷达桥配置：TOML/JSON -> 校验过的 [`RadarBlueprint`]
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("radar.toml")).unwrap();
//! println!("{}@{}", blueprint.link.path, blueprint.link.baud_rate);
//! ```

mod parser;
mod validator;

use std::path::Path;

use contracts::ContractError;
pub use contracts::RadarBlueprint;
pub use parser::ConfigFormat;

pub struct ConfigLoader;

impl ConfigLoader {
    /// 格式由扩展名决定 (.toml / .json)
    pub fn load_from_path(path: &Path) -> Result<RadarBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format).map_err(|e| match e {
            ContractError::ConfigParse { message, source } => ContractError::ConfigParse {
                message: format!("{}: {message}", path.display()),
                source,
            },
            other => other,
        })
    }

    /// 解析并校验
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RadarBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    pub fn to_toml(blueprint: &RadarBlueprint) -> Result<String, ContractError> {
        parser::render(blueprint, ConfigFormat::Toml)
    }

    pub fn to_json(blueprint: &RadarBlueprint) -> Result<String, ContractError> {
        parser::render(blueprint, ConfigFormat::Json)
    }
}
