// In-process stand-in for the GenoLab backend, served with axum on an ephemeral port.
use axum::{
    extract::{Multipart, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use crate::config::ApiConfig;
use crate::services::ApiClient;

const UNKNOWN_STRAIN: i64 = 404;

#[derive(Debug, Clone)]
pub struct UploadCall {
    pub analysis_type: String,
    pub filename: Option<String>,
    pub strain_id: Option<String>,
    pub size: usize,
}

#[derive(Default)]
struct MockState {
    task_scripts: HashMap<String, VecDeque<Value>>,
    status_calls: usize,
    last_authorization: Option<String>,
    uploads: Vec<UploadCall>,
    next_task_id: Option<String>,
    upload_failure: Option<(u16, String)>,
    records: Vec<Value>,
    originals: HashMap<i64, (String, Vec<u8>)>,
    organisms: Vec<Value>,
    strains: Vec<Value>,
    next_id: i64,
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn add_record(&mut self, strain_id: i64, analysis_type: &str, results: Value) -> i64 {
        let id = self.next_id();
        self.records.push(json!({
            "id": id,
            "analysis_type": analysis_type,
            "results": results,
            "timestamp": Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            "strain_id": strain_id,
            "owner_id": 1,
        }));
        id
    }

    fn record(&self, id: i64) -> Option<&Value> {
        self.records.iter().find(|r| r["id"] == json!(id))
    }

    fn organism_ref(&self, id: i64) -> Option<Value> {
        self.organisms.iter().find(|o| o["id"] == json!(id)).map(|o| {
            json!({"id": o["id"], "name": o["name"], "genus": o["genus"], "species": o["species"]})
        })
    }

    fn strains_of(&self, organism_id: i64) -> Vec<Value> {
        self.strains
            .iter()
            .filter(|s| s["organism_id"] == json!(organism_id))
            .cloned()
            .collect()
    }
}

type Shared = Arc<Mutex<MockState>>;

pub struct MockBackend {
    addr: SocketAddr,
    state: Shared,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));

        let app = Router::new()
            .route("/api/analysis/upload/:analysis_type", post(upload))
            .route("/api/analysis/tasks/:task_id", get(task_status))
            .route("/api/analysis/strain/:strain_id", get(strain_records))
            .route("/api/analysis/:id/results/download-txt", get(download_txt))
            .route("/api/analysis/:id/download", get(download_original))
            .route("/api/ceparium/organisms/", get(list_organisms).post(create_organism))
            .route(
                "/api/ceparium/organisms/:id",
                get(get_organism).put(update_organism).delete(delete_organism),
            )
            .route("/api/ceparium/organisms/:id/strains", get(organism_strains))
            .route("/api/ceparium/strains/", get(list_strains).post(create_strain))
            .route("/api/ceparium/strains/:id", get(get_strain))
            .layer(middleware::from_fn_with_state(state.clone(), record_authorization))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: format!("http://{}", self.addr),
            timeout_secs: 5,
            token: None,
        }
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.api_config()).unwrap()
    }

    /// Successive answers for `task_id`; the last one repeats.
    pub fn script_task(&self, task_id: &str, snapshots: Vec<Value>) {
        self.state
            .lock()
            .unwrap()
            .task_scripts
            .insert(task_id.to_string(), snapshots.into());
    }

    pub fn set_next_task_id(&self, task_id: &str) {
        self.state.lock().unwrap().next_task_id = Some(task_id.to_string());
    }

    pub fn fail_uploads(&self, status: u16, detail: &str) {
        self.state.lock().unwrap().upload_failure = Some((status, detail.to_string()));
    }

    pub fn add_record(&self, strain_id: i64, analysis_type: &str, results: Value) -> i64 {
        self.state
            .lock()
            .unwrap()
            .add_record(strain_id, analysis_type, results)
    }

    pub fn status_calls(&self) -> usize {
        self.state.lock().unwrap().status_calls
    }

    pub fn upload_calls(&self) -> Vec<UploadCall> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.lock().unwrap().last_authorization.clone()
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"detail": message}))).into_response()
}

async fn record_authorization(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if authorization.is_some() {
        state.lock().unwrap().last_authorization = authorization;
    }
    next.run(request).await
}

async fn upload(
    State(state): State<Shared>,
    Path(analysis_type): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let mut call = UploadCall {
        analysis_type: analysis_type.clone(),
        filename: None,
        strain_id: None,
        size: 0,
    };
    let mut contents = Vec::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name().unwrap_or("") {
            "file" => {
                call.filename = field.file_name().map(str::to_string);
                contents = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
                call.size = contents.len();
            }
            "strain_id" => call.strain_id = field.text().await.ok(),
            _ => {}
        }
    }

    let mut state = state.lock().unwrap();
    state.uploads.push(call.clone());

    if let Some((status, message)) = state.upload_failure.clone() {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
        return detail(status, &message);
    }

    let filename = call.filename.unwrap_or_default();
    let strain_id: i64 = call.strain_id.and_then(|s| s.parse().ok()).unwrap_or(0);

    if analysis_type == "raw" {
        let analysis_id = state.add_record(
            strain_id,
            "raw_file",
            json!({
                "filename": filename,
                "file_size": contents.len(),
                "upload_status": "completed",
                "message": "Archivo almacenado sin procesar",
            }),
        );
        state.originals.insert(analysis_id, (filename.clone(), contents));
        return Json(json!({
            "message": "Archivo subido exitosamente",
            "file_url": format!("http://storage.local/genolab/{}", filename),
            "analysis_id": analysis_id,
        }))
        .into_response();
    }

    let task_id = state
        .next_task_id
        .take()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    (
        StatusCode::ACCEPTED,
        Json(json!({"task_id": task_id, "message": "Análisis en cola"})),
    )
        .into_response()
}

async fn task_status(State(state): State<Shared>, Path(task_id): Path<String>) -> Response {
    let mut state = state.lock().unwrap();
    state.status_calls += 1;

    let snapshot = match state.task_scripts.get_mut(&task_id) {
        Some(script) if script.len() > 1 => script.pop_front(),
        Some(script) => script.front().cloned(),
        None => None,
    };
    Json(snapshot.unwrap_or_else(|| json!({"state": "PENDING", "status": "Pendiente..."})))
        .into_response()
}

async fn strain_records(State(state): State<Shared>, Path(strain_id): Path<i64>) -> Response {
    if strain_id == UNKNOWN_STRAIN {
        return detail(StatusCode::NOT_FOUND, "Cepa no encontrada.");
    }
    let state = state.lock().unwrap();
    let records: Vec<Value> = state
        .records
        .iter()
        .filter(|r| r["strain_id"] == json!(strain_id))
        .cloned()
        .collect();
    Json(records).into_response()
}

async fn download_txt(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let state = state.lock().unwrap();
    let Some(record) = state.record(id) else {
        return detail(StatusCode::NOT_FOUND, "Análisis no encontrado.");
    };

    let mut body = format!("Analysis ID: {}\nType: {}\n\n", id, record["analysis_type"]);
    if let Some(results) = record["results"].as_object() {
        for (key, value) in results {
            body.push_str(&format!("{}: {}\n", key, value));
        }
    }
    (
        [
            (header::CONTENT_TYPE, "text/plain".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"analysis_results_{}.txt\"", id),
            ),
        ],
        body,
    )
        .into_response()
}

async fn download_original(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let state = state.lock().unwrap();
    match state.originals.get(&id) {
        Some((filename, contents)) => (
            [(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            )],
            contents.clone(),
        )
            .into_response(),
        None => detail(StatusCode::NOT_FOUND, "Archivo original no disponible."),
    }
}

async fn list_organisms(State(state): State<Shared>) -> Response {
    Json(state.lock().unwrap().organisms.clone()).into_response()
}

async fn create_organism(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let id = state.next_id();
    let organism = json!({
        "id": id,
        "name": body["name"],
        "genus": body["genus"],
        "species": body["species"],
        "strains": [],
    });
    state.organisms.push(organism.clone());
    Json(organism).into_response()
}

async fn get_organism(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let state = state.lock().unwrap();
    match state.organisms.iter().find(|o| o["id"] == json!(id)) {
        Some(organism) => {
            let mut organism = organism.clone();
            organism["strains"] = Value::Array(state.strains_of(id));
            Json(organism).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Organismo no encontrado."),
    }
}

async fn update_organism(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    let Some(organism) = state.organisms.iter_mut().find(|o| o["id"] == json!(id)) else {
        return detail(StatusCode::NOT_FOUND, "Organismo no encontrado.");
    };
    for field in ["name", "genus", "species"] {
        if let Some(value) = body.get(field) {
            organism[field] = value.clone();
        }
    }
    Json(organism.clone()).into_response()
}

async fn delete_organism(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let mut state = state.lock().unwrap();
    let Some(index) = state.organisms.iter().position(|o| o["id"] == json!(id)) else {
        return detail(StatusCode::NOT_FOUND, "Organismo no encontrado.");
    };
    let organism = state.organisms.remove(index);
    state.strains.retain(|s| s["organism_id"] != json!(id));
    Json(organism).into_response()
}

async fn organism_strains(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    Json(state.lock().unwrap().strains_of(id)).into_response()
}

async fn list_strains(State(state): State<Shared>) -> Response {
    Json(state.lock().unwrap().strains.clone()).into_response()
}

async fn create_strain(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let organism_id = body["organism_id"].as_i64().unwrap_or(0);
    let Some(organism) = state.organism_ref(organism_id) else {
        return detail(StatusCode::NOT_FOUND, "Organismo no encontrado.");
    };
    let id = state.next_id();
    let strain = json!({
        "id": id,
        "strain_name": body["strain_name"],
        "source": body.get("source").cloned().unwrap_or(Value::Null),
        "organism_id": organism_id,
        "organism": organism,
        "analyses": [],
    });
    state.strains.push(strain.clone());
    Json(strain).into_response()
}

async fn get_strain(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let state = state.lock().unwrap();
    match state.strains.iter().find(|s| s["id"] == json!(id)) {
        Some(strain) => Json(strain.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Cepa no encontrada."),
    }
}
