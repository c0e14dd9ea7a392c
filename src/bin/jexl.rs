use clap::{Parser, Subcommand, ValueEnum};
use jexl_engine::engine::json_context;
use jexl_engine::form::form_registry;
use jexl_engine::workflow::{flow_registry, group_registry};
use jexl_engine::{AnswerLookup, Config, Context, Jexl, Registry, Value};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "jexl", author, version, about = "Evaluate and analyze JEXL expressions", long_about = None)]
struct Args {
    /// JSON config file (max_depth, cache); defaults come from JEXL_* env vars
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the maximum nesting depth
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Which transforms and operators are available
    #[arg(long, value_enum, default_value_t = Domain::Core, global = true)]
    domain: Domain,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Domain {
    Core,
    Form,
    Flow,
    Group,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate an expression
    Eval {
        expression: String,

        /// Variables as a JSON object
        #[arg(short, long)]
        context: Option<String>,

        /// Single variables, `name=value`
        #[arg(long = "var")]
        vars: Vec<String>,

        /// Answers of the current form as a JSON object (form domain)
        #[arg(long)]
        answers: Option<String>,

        /// Slug of the current form (form domain)
        #[arg(long, default_value = "form")]
        form: String,

        /// Output result in JSON format with type and timing
        #[arg(long)]
        output_json: bool,
    },
    /// Report validation findings; exits with 3 when there are any
    Validate { expression: String },
    /// List literal subjects of transforms
    Subjects {
        expression: String,

        /// Only these transforms (repeatable); all transforms when omitted
        #[arg(short, long = "transform")]
        transforms: Vec<String>,
    },
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    log::debug!("using {:?} with domain {:?}", config, args.domain);

    let code = match args.command {
        Commands::Eval { expression, context, vars, answers, form, output_json } => {
            match run_eval(&expression, args.domain, config, context, &vars, answers, form) {
                Ok((value, elapsed_ms)) => {
                    if output_json {
                        println!("{}", format_json_output(&value, elapsed_ms));
                    } else {
                        println!("{}", value);
                    }
                    0
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    2
                }
            }
        }
        Commands::Validate { expression } => match registry_for(args.domain, Arc::new(AnswerLookup::default())) {
            Ok(registry) => {
                let findings = Jexl::with_config(registry, config).validate(&expression);
                for finding in &findings {
                    println!("{}", finding);
                }
                if findings.is_empty() {
                    println!("OK");
                    0
                } else {
                    3
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                2
            }
        },
        Commands::Subjects { expression, transforms } => {
            let names: Vec<&str> = transforms.iter().map(String::as_str).collect();
            let subjects = registry_for(args.domain, Arc::new(AnswerLookup::default()))
                .and_then(|registry| Jexl::with_config(registry, config).extract_subjects(&expression, &names));
            match subjects {
                Ok(subjects) => {
                    let json: Vec<serde_json::Value> = subjects.iter().map(Value::to_json).collect();
                    println!("{}", serde_json::Value::Array(json));
                    0
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    2
                }
            }
        }
    };
    std::process::exit(code);
}

fn load_config(args: &Args) -> Result<Config, jexl_engine::Error> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    Ok(match args.max_depth {
        Some(depth) => config.with_max_depth(depth),
        None => config,
    })
}

fn registry_for(domain: Domain, lookup: Arc<AnswerLookup>) -> Result<Registry, jexl_engine::Error> {
    match domain {
        Domain::Core => Ok(Registry::standard()),
        Domain::Form => form_registry(lookup),
        Domain::Flow => flow_registry(),
        Domain::Group => group_registry(),
    }
}

fn run_eval(
    expression: &str,
    domain: Domain,
    config: Config,
    context: Option<String>,
    vars: &[String],
    answers: Option<String>,
    form: String,
) -> Result<(Value, f64), jexl_engine::Error> {
    let mut ctx = Context::new();

    let lookup = match answers {
        Some(raw) => {
            let map = match Value::from(parse_json(&raw)?) {
                Value::Object(map) => map,
                _ => return Err(jexl_engine::Error::evaluation("--answers must be a JSON object")),
            };
            AnswerLookup::new(form.as_str()).with_form_answers(form.as_str(), map)
        }
        None => AnswerLookup::new(form.as_str()),
    };
    if domain == Domain::Form {
        ctx.extend(lookup.context());
    }

    if let Some(raw) = context {
        ctx.extend(json_context(&parse_json(&raw)?)?);
    }
    for var in vars {
        let (name, raw) = var
            .split_once('=')
            .ok_or_else(|| jexl_engine::Error::evaluation(format!("Invalid variable '{}'. Use name=value", var)))?;
        ctx.insert(name.to_string(), parse_value(raw));
    }

    let jexl = Jexl::with_config(registry_for(domain, Arc::new(lookup))?, config);
    let start = Instant::now();
    let value = jexl.evaluate(expression, &ctx)?;
    Ok((value, start.elapsed().as_secs_f64() * 1000.0))
}

fn parse_json(raw: &str) -> Result<serde_json::Value, jexl_engine::Error> {
    serde_json::from_str(raw).map_err(|e| jexl_engine::Error::evaluation(format!("Invalid JSON: {}", e)))
}

fn format_json_output(value: &Value, execution_time_ms: f64) -> String {
    let output = json!({
        "result": value.to_json(),
        "type": value.type_name(),
        "execution_time": format!("{:.2} ms", execution_time_ms)
    });
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

/// `name=value` right-hand sides: JSON when it parses, otherwise a bare
/// string.
fn parse_value(s: &str) -> Value {
    if (s.starts_with('\'') && s.ends_with('\'')) && s.len() >= 2 {
        return Value::String(s[1..s.len() - 1].to_string());
    }
    match serde_json::from_str::<serde_json::Value>(s) {
        Ok(json) => Value::from(json),
        Err(_) => Value::String(s.to_string()),
    }
}
