use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use log::{info, warn};
use serde::Deserialize;

use charlm_core::decoder::{BeamConfig, BeamSearch};
use charlm_core::model::{CharModel, ModelError};

/// Longest generation a single request may ask for.
const MAX_NUMBER: usize = 10_000;

#[derive(Parser, Debug)]
#[command(name = "charlm-server", about = "Serve a character-level language model over HTTP")]
struct Args {
	/// Model weights file
	#[arg(short, long)]
	model: PathBuf,
	/// Model config file
	#[arg(short, long)]
	config: PathBuf,
	#[arg(long, default_value = "127.0.0.1")]
	host: String,
	#[arg(long, default_value_t = 5000)]
	port: u16,
}

/// Query parameters of the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	context: Option<String>,
	number: Option<usize>,
	beam_width: Option<usize>,
	top_k: Option<usize>,
	min_probability: Option<f64>,
}

#[derive(Deserialize)]
struct RateQuery {
	text: Option<String>,
}

struct SharedData {
	model: CharModel,
}

impl GenerateParams {
	/// Number of characters to generate, 1 by default.
	fn steps(&self) -> Result<usize, String> {
		match self.number.unwrap_or(1) {
			n if (1..=MAX_NUMBER).contains(&n) => Ok(n),
			n => Err(format!("Number must be between 1 and {MAX_NUMBER}, got {n}")),
		}
	}

	/// Beam parameters, falling back to the defaults.
	fn beam_config(&self) -> Result<BeamConfig, String> {
		let defaults = BeamConfig::default();
		let config = BeamConfig {
			beam_width: self.beam_width.unwrap_or(defaults.beam_width),
			top_k: self.top_k.unwrap_or(defaults.top_k),
			min_probability: self.min_probability.unwrap_or(defaults.min_probability),
			..defaults
		};
		config.validate()?;
		Ok(config)
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Runs the beam search on a blocking thread and returns the generated
/// text (context included) as the response body.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<SharedData>, query: web::Query<GenerateParams>) -> impl Responder {
	let context = match &query.context {
		Some(s) if !s.is_empty() => s.clone(),
		_ => return HttpResponse::BadRequest().body("Missing or empty context"),
	};
	let steps = match query.steps() {
		Ok(n) => n,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};
	let config = match query.beam_config() {
		Ok(c) => c,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let data = data.clone();
	let result = web::block(move || BeamSearch::new(&data.model, config).generate(&context, steps)).await;
	match result {
		Ok(Ok(text)) => HttpResponse::Ok().body(text),
		Ok(Err(e)) => {
			warn!("generation failed: {e}");
			HttpResponse::InternalServerError().body(e.to_string())
		}
		Err(_) => HttpResponse::InternalServerError().body("Generation task failed"),
	}
}

/// HTTP GET endpoint `/v1/rate`
///
/// Returns the perplexity and per-character probabilities as JSON.
#[get("/v1/rate")]
async fn get_rating(data: web::Data<SharedData>, query: web::Query<RateQuery>) -> impl Responder {
	let text = match &query.text {
		Some(s) => s,
		None => return HttpResponse::BadRequest().body("Missing text"),
	};
	match data.model.rate(text) {
		Ok(rating) => HttpResponse::Ok().json(rating),
		Err(ModelError::EmptyText) => HttpResponse::BadRequest().body("Empty text"),
		Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
	}
}

#[get("/v1/charset")]
async fn get_charset(data: web::Data<SharedData>) -> impl Responder {
	let charset: Vec<String> = data.model.charset().chars().iter().map(|c| c.escape_debug().to_string()).collect();
	HttpResponse::Ok().body(charset.join("\n"))
}

/// Main entry point for the server.
///
/// Loads the model once; it is shared read-only between workers.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();
	let args = Args::parse();

	let model = CharModel::load(&args.model, &args.config).map_err(|e| std::io::Error::other(e.to_string()))?;
	let shared_data = web::Data::new(SharedData { model });
	info!("listening on {}:{}", args.host, args.port);

	HttpServer::new(move || {
		let cors = Cors::default().allow_any_origin().allowed_methods(vec!["GET"]);
		App::new()
			.wrap(cors)
			.app_data(shared_data.clone())
			.service(get_generated)
			.service(get_rating)
			.service(get_charset)
	})
		.bind((args.host.as_str(), args.port))?
		.run()
		.await
}
