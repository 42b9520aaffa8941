//! Command-line configuration for the `xmljson` converter.
//!
//! Every flag can also be set through an environment variable.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `XMLJSON_OUTPUT` | stdout | Output file |
//! | `XMLJSON_TO` | from input extension | Target format (`json` or `xml`) |
//! | `XMLJSON_ROOT_ELEMENT` | none | Root element wrapping the JSON object |
//! | `XMLJSON_WRITE_ARRAY_ATTRIBUTE` | false | Mark one-element arrays with `json:Array` |
//! | `XMLJSON_OMIT_ROOT_OBJECT` | false | Drop the root element's property |
//! | `XMLJSON_ENCODE_SPECIAL_CHARACTERS` | false | Treat `@ # ? $ !` names as plain elements |
//! | `XMLJSON_INDENT` | 2 | Indent width, 0 for compact output |
//! | `XMLJSON_PRESERVE_WHITESPACE` | false | Keep whitespace-only XML text |
//! | `XMLJSON_LOG_LEVEL` | warn | Log level |

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use xmljson::XmlNodeConverter;
use xmljson::xml::{XmlReadOptions, XmlWriteOptions};

/// Output format of a conversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    /// XML in, JSON out.
    Json,
    /// JSON in, XML out.
    Xml,
}

/// Configuration for one run of the converter.
#[derive(Debug, Clone, Parser)]
#[command(name = "xmljson")]
#[command(about = "Convert XML documents to JSON and back")]
pub struct CliConfig {
    /// Input file. Reads stdin when absent or `-`.
    pub input: Option<PathBuf>,

    /// Output file. Writes stdout when absent.
    #[arg(short, long, env = "XMLJSON_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Target format. Inferred from the input file extension when absent.
    #[arg(long, value_enum, env = "XMLJSON_TO")]
    pub to: Option<Direction>,

    /// Element to wrap the JSON object in when converting to XML.
    #[arg(long, env = "XMLJSON_ROOT_ELEMENT")]
    pub root_element: Option<String>,

    /// Mark elements created from one-element arrays with `json:Array="true"`.
    #[arg(long, env = "XMLJSON_WRITE_ARRAY_ATTRIBUTE")]
    pub write_array_attribute: bool,

    /// Write the root element's value without its enclosing property.
    #[arg(long, env = "XMLJSON_OMIT_ROOT_OBJECT")]
    pub omit_root_object: bool,

    /// Treat every JSON property as an element, escaping special characters.
    #[arg(long, env = "XMLJSON_ENCODE_SPECIAL_CHARACTERS")]
    pub encode_special_characters: bool,

    /// Indent width of the output. 0 writes compact output.
    #[arg(long, env = "XMLJSON_INDENT", default_value = "2")]
    pub indent: usize,

    /// Keep whitespace-only text nodes when reading XML.
    #[arg(long, env = "XMLJSON_PRESERVE_WHITESPACE")]
    pub preserve_whitespace: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "XMLJSON_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            to: None,
            root_element: None,
            write_array_attribute: false,
            omit_root_object: false,
            encode_special_characters: false,
            indent: 2,
            preserve_whitespace: false,
            log_level: "warn".to_string(),
        }
    }
}

impl CliConfig {
    /// The input path, or `None` for stdin.
    pub fn input_path(&self) -> Option<&Path> {
        self.input
            .as_deref()
            .filter(|path| path.as_os_str() != "-")
    }

    /// The target format, from `--to` or the input file extension.
    ///
    /// A `.json` input converts to XML, anything else with an extension
    /// converts to JSON. Stdin without `--to` has no direction.
    pub fn direction(&self) -> Option<Direction> {
        if let Some(to) = self.to {
            return Some(to);
        }
        let extension = self.input_path()?.extension()?.to_str()?;
        if extension.eq_ignore_ascii_case("json") {
            Some(Direction::Xml)
        } else {
            Some(Direction::Json)
        }
    }

    /// The converter options selected by the flags.
    pub fn converter(&self) -> XmlNodeConverter {
        let mut converter = XmlNodeConverter::new()
            .with_write_array_attribute(self.write_array_attribute)
            .with_omit_root_object(self.omit_root_object)
            .with_encode_special_characters(self.encode_special_characters);
        converter.deserialize_root_element_name = self.root_element.clone();
        converter
    }

    pub fn read_options(&self) -> XmlReadOptions {
        XmlReadOptions {
            preserve_whitespace: self.preserve_whitespace,
        }
    }

    pub fn write_options(&self) -> XmlWriteOptions {
        match self.indent {
            0 => XmlWriteOptions::default(),
            spaces => XmlWriteOptions::indented(spaces),
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.direction().is_none() {
            errors.push(
                "Cannot infer the target format from the input; pass --to json or --to xml"
                    .to_string(),
            );
        }

        if self.root_element.as_deref() == Some("") {
            errors.push("Root element name cannot be empty".to_string());
        }

        if self.indent > 16 {
            errors.push("Indent cannot exceed 16 spaces".to_string());
        }

        if let (Some(input), Some(output)) = (self.input_path(), self.output.as_deref()) {
            if input == output {
                errors.push("Input and output cannot be the same file".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            to: Some(Direction::Json),
            indent: 0,
            log_level: "debug".to_string(),
            ..Default::default()
        }
    }
}
