//! 配置文本 <-> RadarBlueprint
//!
//! TOML 为主，JSON 用于程序生成的配置。解析错误带上出错的行号。

use std::path::Path;

use contracts::{ContractError, RadarBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// 从路径推断格式
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse(format!("{}: no file extension", path.display()))
        })?;
        Self::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

/// 解析配置文本（不做校验）
pub fn parse(content: &str, format: ConfigFormat) -> Result<RadarBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| {
            let line = e.span().map(|span| line_of(content, span.start));
            let detail = e.message().to_string();
            parse_error(format, line, detail, e)
        }),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| {
            let line = Some(e.line()).filter(|&line| line > 0);
            let detail = e.to_string();
            parse_error(format, line, detail, e)
        }),
    }
}

/// 序列化为配置文本
pub fn render(blueprint: &RadarBlueprint, format: ConfigFormat) -> Result<String, ContractError> {
    let rendered = match format {
        ConfigFormat::Toml => toml::to_string_pretty(blueprint).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::to_string_pretty(blueprint).map_err(|e| e.to_string()),
    };
    rendered.map_err(|e| ContractError::config_parse(format!("{} serialize error: {e}", format.name())))
}

fn parse_error<E>(format: ConfigFormat, line: Option<usize>, detail: String, source: E) -> ContractError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let message = match line {
        Some(line) => format!("{} parse error at line {line}: {detail}", format.name()),
        None => format!("{} parse error: {detail}", format.name()),
    };
    ContractError::ConfigParse {
        message,
        source: Some(Box::new(source)),
    }
}

/// 1-based line containing byte `offset`
fn line_of(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    content.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DropPolicy, SinkOverflow, SinkType};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[link]
path = "/dev/ttyUSB0"

[[sinks]]
name = "log_sink"
sink_type = "log"
overflow = "drop_newest"
"#;
        let bp = parse(content, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.link.path, "/dev/ttyUSB0");
        assert_eq!(bp.link.baud_rate, 256_000);
        assert_eq!(bp.sinks.len(), 1);
        assert_eq!(bp.sinks[0].sink_type, SinkType::Log);
        assert_eq!(bp.sinks[0].overflow, SinkOverflow::DropNewest);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "link": { "path": "/dev/ttyAMA0", "baud_rate": 115200 },
            "pipeline": { "queue_capacity": 8, "drop_policy": "block" },
            "control": { "tracking_on_start": true },
            "sinks": [{ "name": "reports", "sink_type": "broadcast" }]
        }"#;
        let bp = parse(content, ConfigFormat::Json).unwrap();
        assert_eq!(bp.link.baud_rate, 115_200);
        assert_eq!(bp.pipeline.drop_policy, DropPolicy::Block);
        assert_eq!(bp.control.tracking_on_start, Some(true));
    }

    #[test]
    fn test_toml_error_names_line() {
        let content = "[link]\npath = \"/dev/ttyS0\"\nbaud_rate = \"fast\"\n";
        let err = parse(content, ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn test_json_error_names_line() {
        let err = parse("{\n  \"link\": 5\n}", ConfigFormat::Json).unwrap_err();
        assert!(err.to_string().contains("JSON parse error at line 2"), "{err}");
    }

    #[test]
    fn test_unknown_sink_type_is_parse_error() {
        let content = r#"
[[sinks]]
name = "x"
sink_type = "carrier_pigeon"
"#;
        assert!(matches!(
            parse(content, ConfigFormat::Toml),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("radar.TOML")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("/etc/radar.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("radar.yaml")).is_err());
        assert!(ConfigFormat::from_path(Path::new("radar")).is_err());
    }

    #[test]
    fn test_line_of() {
        assert_eq!(line_of("a\nb\nc", 0), 1);
        assert_eq!(line_of("a\nb\nc", 2), 2);
        assert_eq!(line_of("a\nb\nc", 99), 3);
    }
}
