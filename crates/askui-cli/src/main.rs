//! askui CLI - request human decisions from the terminal.
//!
//! Each widget subcommand creates a request on the server, blocks on the
//! long-poll wait loop until someone answers in the web UI, then decodes
//! the opaque output into its typed shape and prints it.

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use askui_client::{Client, CreateRequestParams};
use askui_core::{
    ConfirmInput, ConfirmOutput, FormInput, FormOutput, ImageInput, ImageItem, ImageOutput,
    SelectInput, SelectOutput, TableInput, TableOutput, UiRequest, UploadInput, UploadOutput,
    WidgetType,
};

/// askui - CLI + backend for human-in-the-loop UI requests
#[derive(Parser)]
#[command(name = "askui")]
#[command(about = "Request human decisions via a web frontend", long_about = None)]
struct Cli {
    /// Server base URL
    #[arg(long, default_value = "http://localhost:3000")]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every widget subcommand.
#[derive(Args)]
struct WaitOpts {
    /// Request expiration in seconds (server-side)
    #[arg(long, default_value_t = 300)]
    timeout: i64,

    /// How long to wait for a response in seconds (0 = wait forever)
    #[arg(long, default_value_t = 60)]
    wait_timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the askui backend server
    Serve {
        /// Listen address
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: String,
    },

    /// Request a yes/no confirmation
    Confirm {
        #[command(flatten)]
        wait: WaitOpts,

        /// Dialog title
        #[arg(long)]
        title: String,

        /// Optional dialog message
        #[arg(long)]
        message: Option<String>,

        /// Optional approve button text
        #[arg(long)]
        approve_text: Option<String>,

        /// Optional reject button text
        #[arg(long)]
        reject_text: Option<String>,
    },

    /// Request a selection from a list of options
    Select {
        #[command(flatten)]
        wait: WaitOpts,

        /// Dialog title
        #[arg(long)]
        title: String,

        /// Option value (repeatable)
        #[arg(long = "option", required = true)]
        options: Vec<String>,

        /// Allow selecting multiple options
        #[arg(long)]
        multi: bool,

        /// Show a search box
        #[arg(long)]
        searchable: bool,
    },

    /// Request structured data via a JSON Schema form
    Form {
        #[command(flatten)]
        wait: WaitOpts,

        /// Dialog title
        #[arg(long)]
        title: String,

        /// JSON Schema, inline or @path/to/file.json
        #[arg(long)]
        schema: String,
    },

    /// Request a row selection from tabular data
    Table {
        #[command(flatten)]
        wait: WaitOpts,

        /// Dialog title
        #[arg(long)]
        title: String,

        /// Row data as a JSON array, inline or @path/to/file.json
        #[arg(long)]
        data: String,

        /// Column to display (repeatable; defaults to all)
        #[arg(long = "column")]
        columns: Vec<String>,

        /// Allow selecting multiple rows
        #[arg(long)]
        multi_select: bool,

        /// Show a search box
        #[arg(long)]
        searchable: bool,
    },

    /// Request file uploads from the user
    Upload {
        #[command(flatten)]
        wait: WaitOpts,

        /// Dialog title
        #[arg(long)]
        title: String,

        /// Accepted file type or extension (repeatable)
        #[arg(long = "accept")]
        accept: Vec<String>,

        /// Allow uploading multiple files
        #[arg(long)]
        multiple: bool,

        /// Maximum file size in bytes
        #[arg(long)]
        max_size: Option<i64>,
    },

    /// Request an image-based selection or confirmation
    Image {
        #[command(flatten)]
        wait: WaitOpts,

        /// Dialog title
        #[arg(long)]
        title: String,

        /// Optional dialog message / question
        #[arg(long)]
        message: Option<String>,

        /// Widget mode: select|confirm
        #[arg(long, default_value = "select")]
        mode: String,

        /// Image source (repeatable): local file path, URL, or data: URI
        #[arg(long = "image", required = true)]
        images: Vec<String>,

        /// Optional per-image label (repeatable; count must match --image)
        #[arg(long = "image-label")]
        image_labels: Vec<String>,

        /// Optional per-image alt text (repeatable; count must match --image)
        #[arg(long = "image-alt")]
        image_alts: Vec<String>,

        /// Optional per-image caption (repeatable; count must match --image)
        #[arg(long = "image-caption")]
        image_captions: Vec<String>,

        /// Option value for the images-as-context question variant (repeatable)
        #[arg(long = "option")]
        options: Vec<String>,

        /// Allow selecting multiple options / images
        #[arg(long)]
        multi: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let client = Client::new(&cli.base_url);

    match cli.command {
        Commands::Serve { addr } => {
            let config = askui_server::Config {
                bind_addr: addr,
                ..askui_server::Config::default()
            };
            askui_server::run(config).await?;
        }
        Commands::Confirm {
            wait,
            title,
            message,
            approve_text,
            reject_text,
        } => {
            let input = ConfirmInput {
                title,
                message,
                approve_text,
                reject_text,
            };
            let req = run_widget(&client, WidgetType::Confirm, &input, &wait).await?;
            let out: ConfirmOutput = decode_output(&req)?;

            print_header(&req);
            println!("  Approved:  {}", out.approved);
            if !out.timestamp.is_empty() {
                println!("  Answered:  {}", out.timestamp);
            }
            print_comment(out.comment.as_deref());
        }
        Commands::Select {
            wait,
            title,
            options,
            multi,
            searchable,
        } => {
            let input = SelectInput {
                title,
                options,
                multi: Some(multi),
                searchable: Some(searchable),
            };
            let req = run_widget(&client, WidgetType::Select, &input, &wait).await?;
            let out: SelectOutput = decode_output(&req)?;

            print_header(&req);
            println!("  Selected:  {}", compact_json(&out.selected));
            print_comment(out.comment.as_deref());
        }
        Commands::Form { wait, title, schema } => {
            let input = FormInput {
                title,
                schema: json_arg(&schema)?,
            };
            let req = run_widget(&client, WidgetType::Form, &input, &wait).await?;
            let out: FormOutput = decode_output(&req)?;

            print_header(&req);
            println!("  Data:      {}", compact_json(&out.data));
            print_comment(out.comment.as_deref());
        }
        Commands::Table {
            wait,
            title,
            data,
            columns,
            multi_select,
            searchable,
        } => {
            let rows = match json_arg(&data)? {
                Value::Array(rows) => rows,
                _ => return Err("--data must be a JSON array of rows".into()),
            };
            let input = TableInput {
                title,
                data: rows,
                columns,
                multi_select: Some(multi_select),
                searchable: Some(searchable),
            };
            let req = run_widget(&client, WidgetType::Table, &input, &wait).await?;
            let out: TableOutput = decode_output(&req)?;

            print_header(&req);
            println!("  Selected:  {}", compact_json(&out.selected));
            print_comment(out.comment.as_deref());
        }
        Commands::Upload {
            wait,
            title,
            accept,
            multiple,
            max_size,
        } => {
            let input = UploadInput {
                title,
                accept,
                multiple: Some(multiple),
                max_size,
                callback_url: None,
            };
            let req = run_widget(&client, WidgetType::Upload, &input, &wait).await?;
            let out: UploadOutput = decode_output(&req)?;

            print_header(&req);
            println!("  Files ({}):", out.files.len());
            for file in &out.files {
                println!("    - {} ({} bytes, {})", file.name, file.size, file.mime_type);
            }
            print_comment(out.comment.as_deref());
        }
        Commands::Image {
            wait,
            title,
            message,
            mode,
            images,
            image_labels,
            image_alts,
            image_captions,
            options,
            multi,
        } => {
            for (flag, values) in [
                ("--image-label", &image_labels),
                ("--image-alt", &image_alts),
                ("--image-caption", &image_captions),
            ] {
                if !values.is_empty() && values.len() != images.len() {
                    return Err(format!(
                        "{} count ({}) must match --image count ({})",
                        flag,
                        values.len(),
                        images.len()
                    )
                    .into());
                }
            }

            let ttl = if wait.timeout <= 0 { 300 } else { wait.timeout };
            let mut items = Vec::with_capacity(images.len());
            for (i, raw) in images.iter().enumerate() {
                // Anything that is not a URL or data URI is a local path to
                // upload first.
                let src = if raw.starts_with("http://")
                    || raw.starts_with("https://")
                    || raw.starts_with("data:")
                {
                    raw.clone()
                } else {
                    let uploaded = client.upload_image(std::path::Path::new(raw), ttl).await?;
                    uploaded.url
                };
                items.push(ImageItem {
                    src,
                    alt: image_alts.get(i).cloned(),
                    label: image_labels.get(i).cloned(),
                    caption: image_captions.get(i).cloned(),
                });
            }

            let input = ImageInput {
                title,
                message,
                images: items,
                mode,
                options,
                multi: Some(multi),
            };
            let req = run_widget(&client, WidgetType::Image, &input, &wait).await?;
            let out: ImageOutput = decode_output(&req)?;

            print_header(&req);
            println!("  Selected:  {}", compact_json(&out.selected));
            if !out.timestamp.is_empty() {
                println!("  Answered:  {}", out.timestamp);
            }
            print_comment(out.comment.as_deref());
        }
    }

    Ok(())
}

/// Create a request and block on the long-poll wait loop.
async fn run_widget<T: serde::Serialize>(
    client: &Client,
    kind: WidgetType,
    input: &T,
    wait: &WaitOpts,
) -> Result<UiRequest, Box<dyn std::error::Error>> {
    let input = serde_json::to_value(input)?;
    let created = client
        .create_request(CreateRequestParams {
            kind,
            input,
            timeout_secs: wait.timeout,
            session_id: "global".to_string(),
        })
        .await
        .map_err(|e| format!("create request: {e}"))?;

    client
        .wait_request(created.id.as_str(), wait.wait_timeout)
        .await
        .map_err(|e| format!("wait for response: {e}").into())
}

/// Decode the opaque output into its typed shape; an absent output decodes
/// to the type's default.
fn decode_output<T: serde::de::DeserializeOwned + Default>(
    req: &UiRequest,
) -> Result<T, Box<dyn std::error::Error>> {
    match &req.output {
        Some(value) => Ok(serde_json::from_value(value.clone())?),
        None => Ok(T::default()),
    }
}

/// Parse a JSON flag value: inline JSON, or @path to read from a file.
fn json_arg(raw: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => raw.to_string(),
    };
    Ok(serde_json::from_str(&text)?)
}

fn compact_json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn print_header(req: &UiRequest) {
    println!("  Request:   {}", req.id);
    println!("  Status:    {:?}", req.status);
}

fn print_comment(comment: Option<&str>) {
    if let Some(comment) = comment {
        println!("  Comment:   {comment}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_arg_inline() {
        let value = json_arg(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_json_arg_rejects_garbage() {
        assert!(json_arg("{not json").is_err());
    }

    #[test]
    fn test_cli_parses_confirm() {
        let cli = Cli::parse_from([
            "askui",
            "confirm",
            "--title",
            "Deploy?",
            "--message",
            "to prod",
            "--wait-timeout",
            "0",
        ]);
        match cli.command {
            Commands::Confirm { wait, title, message, .. } => {
                assert_eq!(title, "Deploy?");
                assert_eq!(message.as_deref(), Some("to prod"));
                assert_eq!(wait.wait_timeout, 0);
                assert_eq!(wait.timeout, 300);
            }
            _ => panic!("expected confirm"),
        }
    }

    #[test]
    fn test_cli_requires_image_flag() {
        let result = Cli::try_parse_from(["askui", "image", "--title", "Pick one"]);
        assert!(result.is_err());
    }
}
