//! xmljson
//!
//! Converts XML documents to JSON and JSON back to XML.

mod config;

use std::fs;
use std::io::{self, Read, Write};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::info;
use xmljson::DecodeTarget;
use xmljson::xml::{node_to_xml_string, parse_str_with};

use config::{CliConfig, Direction};

/// Installs the stderr log subscriber. `RUST_LOG` overrides `level`.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("xmljson={},xmljson_cli={}", level, level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    run(&config)
}

/// Reads the input, converts it and writes the result.
fn run(config: &CliConfig) -> anyhow::Result<()> {
    let direction = config
        .direction()
        .context("target format could not be determined")?;

    let input = read_input(config)?;
    info!(
        input = ?config.input_path(),
        output = ?config.output,
        ?direction,
        bytes = input.len(),
        "Converting"
    );

    let mut converted = convert(config, direction, &input)?;
    converted.push('\n');

    match &config.output {
        Some(path) => fs::write(path, converted)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => io::stdout().lock().write_all(converted.as_bytes())?,
    }
    Ok(())
}

fn read_input(config: &CliConfig) -> anyhow::Result<String> {
    match config.input_path() {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

fn convert(config: &CliConfig, direction: Direction, input: &str) -> anyhow::Result<String> {
    let converter = config.converter();
    match direction {
        Direction::Json => {
            let doc = parse_str_with(input, &config.read_options())?;
            let value = converter.to_json_value(&doc, doc.root())?;
            json_text(&value, config.indent)
        }
        Direction::Xml => {
            let value: Value = serde_json::from_str(input).context("input is not valid JSON")?;
            let doc = converter.from_json_value(&value, DecodeTarget::Document)?;
            Ok(node_to_xml_string(&doc, doc.root(), &config.write_options())?)
        }
    }
}

fn json_text(value: &Value, indent: usize) -> anyhow::Result<String> {
    if indent == 0 {
        return Ok(serde_json::to_string(value)?);
    }
    let spaces = " ".repeat(indent);
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(spaces.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8(out)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_xml_file_to_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_temp(
            &dir,
            "order.xml",
            r#"<order id="7"><item>a</item><item>b</item></order>"#,
        );
        let output = dir.path().join("order.json");

        let config = CliConfig {
            input: Some(input),
            output: Some(output.clone()),
            indent: 0,
            ..Default::default()
        };
        run(&config).unwrap();

        assert_eq!(
            fs::read_to_string(output).unwrap(),
            "{\"order\":{\"@id\":\"7\",\"item\":[\"a\",\"b\"]}}\n"
        );
    }

    #[test]
    fn test_json_file_to_xml_with_root_element() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_temp(&dir, "data.json", r#"{"a": 1, "b": [true]}"#);
        let output = dir.path().join("data.xml");

        let config = CliConfig {
            input: Some(input),
            output: Some(output.clone()),
            root_element: Some("root".to_string()),
            write_array_attribute: true,
            indent: 0,
            ..Default::default()
        };
        run(&config).unwrap();

        assert_eq!(
            fs::read_to_string(output).unwrap(),
            "<root><a>1</a><b json:Array=\"true\" xmlns:json=\"http://james.newtonking.com/projects/json\">true</b></root>\n"
        );
    }

    #[test]
    fn test_json_indent_width() {
        let value = serde_json::json!({"a": "1"});
        assert_eq!(json_text(&value, 4).unwrap(), "{\n    \"a\": \"1\"\n}");
        assert_eq!(json_text(&value, 0).unwrap(), "{\"a\":\"1\"}");
    }

    #[test]
    fn test_conversion_errors_are_reported() {
        let config = CliConfig::for_testing();
        let err = convert(&config, Direction::Xml, r#"{"a": 1, "b": 2}"#).unwrap_err();
        assert!(err.to_string().contains("multiple properties"));

        let err = convert(&config, Direction::Json, "<open>").unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
