//! AXL Client CLI
//!
//! Command-line interface for inspecting resource descriptions, shaping
//! payloads, converting embedded documents and running upserts.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use axl_client::{
    decode, encode, filter_to_shape, filter_to_target, load_description, load_json, load_record,
    patch, resolve_identity, sanitized, Record, ResourceSchema, ShapeKind, DEFAULT_DELIMITER,
    DEFAULT_PREFERRED_KEY,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "axl-client")]
#[command(about = "Shape payloads and upsert resources against AXL-style services")]
#[command(version)]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the identifier alternatives of a resource description
    Choices {
        /// Description source: file path or URL (http:// or https://)
        description: String,
    },

    /// Resolve the single identifier set a data record addresses
    Identity {
        /// Description source: file path or URL
        description: String,

        /// Data record file (`-` for stdin)
        data: PathBuf,

        /// Surrogate key that wins when supplied
        #[arg(long, default_value = DEFAULT_PREFERRED_KEY)]
        preferred_key: String,
    },

    /// Filter a data record to the fields an operation accepts
    Filter {
        /// Description source: file path or URL
        description: String,

        /// Data record file (`-` for stdin)
        data: PathBuf,

        /// Target shape: create, update, fetch-response, list-response
        #[arg(long, short, default_value = "create")]
        shape: String,

        /// How many levels deep to filter
        #[arg(long, default_value_t = 1, conflicts_with = "whole_tree")]
        depth: usize,

        /// Filter the whole tree against the full shape (errors on mismatch)
        #[arg(long)]
        whole_tree: bool,
    },

    /// Print the empty model of a shape
    Model {
        /// Description source: file path or URL
        description: String,

        /// Shape: create, update, fetch-response, list-response
        #[arg(long, short, default_value = "create")]
        shape: String,

        /// Keep remote type names at the leaves
        #[arg(long)]
        types: bool,
    },

    /// Collapse wire leaf wrappers in a response document
    Sanitize {
        /// JSON file (`-` for stdin)
        input: PathBuf,
    },

    /// Convert and edit embedded tag-structured documents
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },

    /// Create or update a resource so it matches a data record
    #[cfg(feature = "remote")]
    Upsert {
        /// Description source: file path or URL
        description: String,

        /// Data record file (`-` for stdin)
        data: PathBuf,

        #[command(flatten)]
        connection: ConnectionArgs,

        /// Create defaults file: {"resourceType": {field: value}}
        #[arg(long)]
        defaults: Option<PathBuf>,
    },

    /// Fetch one resource
    #[cfg(feature = "remote")]
    Get {
        /// Description source: file path or URL
        description: String,

        /// Data record file holding an identifier (`-` for stdin)
        data: PathBuf,

        #[command(flatten)]
        connection: ConnectionArgs,

        /// Collapse wire leaf wrappers in the response
        #[arg(long)]
        sanitize: bool,
    },

    /// Apply, restart or reset a device
    #[cfg(feature = "remote")]
    Device {
        /// Device action
        #[arg(value_parser = ["apply", "restart", "reset"])]
        action: String,

        /// Description source: file path or URL
        description: String,

        /// Data record file holding an identifier (`-` for stdin)
        data: PathBuf,

        #[command(flatten)]
        connection: ConnectionArgs,
    },
}

#[derive(Subcommand)]
enum DocCommands {
    /// Decode a tag fragment into JSON
    Decode {
        /// Fragment file (`-` for stdin)
        input: PathBuf,
    },

    /// Encode a JSON document into a tag fragment
    Encode {
        /// JSON file (`-` for stdin)
        input: PathBuf,
    },

    /// Set one path in a tag fragment and print the new fragment
    Patch {
        /// Fragment file (`-` for stdin)
        input: PathBuf,

        /// Path to set, e.g. ice/mode
        #[arg(long)]
        path: String,

        /// Value to store at the path
        #[arg(long)]
        value: String,

        /// Path segment delimiter
        #[arg(long, default_value = DEFAULT_DELIMITER)]
        delimiter: String,
    },
}

#[cfg(feature = "remote")]
#[derive(clap::Args)]
struct ConnectionArgs {
    /// Service base URL
    #[arg(long, env = "AXL_ENDPOINT")]
    endpoint: String,

    #[arg(long, env = "AXL_USERNAME")]
    username: String,

    #[arg(long, env = "AXL_PASSWORD", hide_env_values = true)]
    password: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let pretty = cli.pretty;

    let result = match cli.command {
        Commands::Choices { description } => run_choices(&description, pretty),
        Commands::Identity {
            description,
            data,
            preferred_key,
        } => run_identity(&description, &data, &preferred_key, pretty),
        Commands::Filter {
            description,
            data,
            shape,
            depth,
            whole_tree,
        } => run_filter(&description, &data, &shape, depth, whole_tree, pretty),
        Commands::Model {
            description,
            shape,
            types,
        } => run_model(&description, &shape, types, pretty),
        Commands::Sanitize { input } => run_sanitize(&input, pretty),
        Commands::Doc { command } => run_doc(command, pretty),
        #[cfg(feature = "remote")]
        Commands::Upsert {
            description,
            data,
            connection,
            defaults,
        } => remote::run_upsert(&description, &data, &connection, defaults.as_deref(), pretty),
        #[cfg(feature = "remote")]
        Commands::Get {
            description,
            data,
            connection,
            sanitize,
        } => remote::run_get(&description, &data, &connection, sanitize, pretty),
        #[cfg(feature = "remote")]
        Commands::Device {
            action,
            description,
            data,
            connection,
        } => remote::run_device(&action, &description, &data, &connection),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_choices(description: &str, pretty: bool) -> Result<(), u8> {
    let schema = description_from(description)?;
    let Some(choices) = schema.choice_groups() else {
        eprintln!("Error: {} has no fetch request", schema.resource());
        return Err(2);
    };
    emit(&choices.to_value(), pretty)
}

fn run_identity(
    description: &str,
    data: &Path,
    preferred_key: &str,
    pretty: bool,
) -> Result<(), u8> {
    let schema = description_from(description)?;
    let data = record_from(data)?;
    let Some(choices) = schema.choice_groups() else {
        eprintln!("Error: {} has no fetch request", schema.resource());
        return Err(2);
    };
    let identity = resolve_identity(&data, choices, preferred_key);
    emit(identity.fields(), pretty)
}

fn run_filter(
    description: &str,
    data: &Path,
    shape: &str,
    depth: usize,
    whole_tree: bool,
    pretty: bool,
) -> Result<(), u8> {
    let schema = description_from(description)?;
    let data = record_from(data)?;
    let kind = shape_kind(shape)?;
    let Some(target) = schema.shape(kind) else {
        eprintln!("Error: {} does not support '{}'", schema.resource(), kind.operation());
        return Err(2);
    };

    if whole_tree {
        let filtered = filter_to_target(&Value::Object(data), &Value::Object(target.clone()))
            .map_err(|e| {
                eprintln!("Error: {}", e);
                2u8
            })?;
        emit(&filtered, pretty)
    } else {
        emit(&filter_to_shape(&data, target, depth), pretty)
    }
}

fn run_model(description: &str, shape: &str, types: bool, pretty: bool) -> Result<(), u8> {
    let schema = description_from(description)?;
    let kind = shape_kind(shape)?;
    match schema.model(kind, types) {
        Some(model) => emit(&model, pretty),
        None => {
            eprintln!("Error: {} does not support '{}'", schema.resource(), kind.operation());
            Err(2)
        }
    }
}

fn run_sanitize(input: &Path, pretty: bool) -> Result<(), u8> {
    let value = if input == Path::new("-") {
        serde_json::from_str(&text_from(input)?).map_err(|e| {
            eprintln!("Error: invalid JSON: {}", e);
            2u8
        })?
    } else {
        load_json(input).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?
    };
    emit(&sanitized(value), pretty)
}

fn run_doc(command: DocCommands, pretty: bool) -> Result<(), u8> {
    match command {
        DocCommands::Decode { input } => {
            let document = decode(&text_from(&input)?).map_err(|e| {
                eprintln!("Error: {}", e);
                2u8
            })?;
            emit(&document, pretty)
        }
        DocCommands::Encode { input } => {
            let document = record_from(&input)?;
            let fragment = encode(&document).map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?;
            println!("{}", fragment);
            Ok(())
        }
        DocCommands::Patch {
            input,
            path,
            value,
            delimiter,
        } => {
            let mut document = decode(&text_from(&input)?).map_err(|e| {
                eprintln!("Error: {}", e);
                2u8
            })?;
            let fragment = patch(&mut document, &path, value, &delimiter)
                .and_then(|()| encode(&document))
                .map_err(|e| {
                    eprintln!("Error: {}", e);
                    e.exit_code() as u8
                })?;
            println!("{}", fragment);
            Ok(())
        }
    }
}

#[cfg(feature = "remote")]
mod remote {
    use std::path::Path;
    use std::time::Duration;

    use axl_client::{
        load_defaults, ConnectionConfig, HttpService, Operation, ResourceClient, ReturnedTags,
    };

    use super::{description_from, emit, record_from, ConnectionArgs};

    fn service(args: &ConnectionArgs) -> Result<HttpService, u8> {
        let config = ConnectionConfig::new(&args.endpoint)
            .credentials(&args.username, &args.password)
            .timeout(Duration::from_secs(args.timeout))
            .tls_verify(!args.insecure);
        HttpService::new(config).map_err(|e| {
            eprintln!("Error: {}", e);
            3u8
        })
    }

    pub(super) fn run_upsert(
        description: &str,
        data: &Path,
        connection: &ConnectionArgs,
        defaults: Option<&Path>,
        pretty: bool,
    ) -> Result<(), u8> {
        let schema = description_from(description)?;
        let data = record_from(data)?;
        let defaults = defaults
            .map(load_defaults)
            .transpose()
            .map_err(|e| {
                eprintln!("Error loading defaults: {}", e);
                e.exit_code() as u8
            })?;
        let service = service(connection)?;

        let mut client = ResourceClient::new(&service, &schema);
        if let Some(defaults) = &defaults {
            client = client.defaults(defaults);
        }

        let outcome = client.upsert(&data).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
        emit(&outcome, pretty)
    }

    pub(super) fn run_get(
        description: &str,
        data: &Path,
        connection: &ConnectionArgs,
        sanitize: bool,
        pretty: bool,
    ) -> Result<(), u8> {
        let schema = description_from(description)?;
        let data = record_from(data)?;
        let service = service(connection)?;

        let found = ResourceClient::new(&service, &schema)
            .get(&data, &ReturnedTags::All, sanitize)
            .map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?;
        emit(&found, pretty)
    }

    pub(super) fn run_device(
        action: &str,
        description: &str,
        data: &Path,
        connection: &ConnectionArgs,
    ) -> Result<(), u8> {
        let Some(action) = Operation::parse_action(action) else {
            eprintln!("Error: unknown device action '{}'", action);
            return Err(2);
        };
        let schema = description_from(description)?;
        let data = record_from(data)?;
        let service = service(connection)?;

        let reference = ResourceClient::new(&service, &schema)
            .perform(action, &data)
            .map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?;
        println!("{}", reference);
        Ok(())
    }
}

fn description_from(source: &str) -> Result<ResourceSchema, u8> {
    load_description(source).map_err(|e| {
        eprintln!("Error: {}", e);
        if let axl_client::LoadError::InvalidDescription { issues } = &e {
            for issue in issues {
                eprintln!("  {}", issue);
            }
        }
        e.exit_code() as u8
    })
}

fn record_from(path: &Path) -> Result<Record, u8> {
    load_record(path).map_err(|e| {
        eprintln!("Error loading {}: {}", path.display(), e);
        e.exit_code() as u8
    })
}

fn text_from(path: &Path) -> Result<String, u8> {
    let content = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin())
    } else {
        std::fs::read_to_string(path)
    };
    content.map_err(|e| {
        eprintln!("Error reading {}: {}", path.display(), e);
        3u8
    })
}

fn shape_kind(name: &str) -> Result<ShapeKind, u8> {
    ShapeKind::parse(name).ok_or_else(|| {
        eprintln!(
            "Error: unknown shape '{}' (expected create, update, fetch-response or list-response)",
            name
        );
        2u8
    })
}

fn emit<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<(), u8> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", output);
    Ok(())
}
