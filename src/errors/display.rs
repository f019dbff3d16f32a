use crate::errors::{ApiError, GenolabError};

// Turns an error into the text a view shows inline. Controllers are the only callers;
// nothing propagates past them.
impl GenolabError {
    pub fn user_message(&self) -> String {
        match self {
            // Validation errors block the submission and are shown as-is
            GenolabError::Validation(err) => err.to_string(),

            GenolabError::Submission { detail: Some(detail), .. } => {
                format!("Error al subir el archivo: {}", detail)
            }
            GenolabError::Submission { detail: None, .. } => "Error al subir el archivo.".into(),

            // Polling halts; the last seen status stays on screen
            GenolabError::Polling(err) => format!(
                "Se perdió el seguimiento de la tarea {}: {}",
                err.task_id,
                describe_api_error(&err.source)
            ),

            GenolabError::Api(err) => describe_api_error(err),

            GenolabError::ChartExport(msg) => format!("No se pudo exportar el gráfico: {}", msg),

            GenolabError::File(err) => format!("Error de archivo: {}", err),
        }
    }
}

fn describe_api_error(err: &ApiError) -> String {
    match err {
        ApiError::Status { status: 401, .. } => "La sesión expiró, inicia sesión de nuevo".into(),
        ApiError::Status { status: 403, .. } => "Acceso denegado".into(),
        ApiError::Status { status: 404, detail } => detail
            .clone()
            .unwrap_or_else(|| "Recurso no encontrado".into()),
        ApiError::Status { status, .. } if *status >= 500 => {
            "Error del servidor, contacta al administrador".into()
        }
        ApiError::Timeout(seconds) => {
            format!("El servidor no respondió en {} segundos", seconds)
        }
        ApiError::Connect(_) => "No se pudo conectar con el servidor".into(),
        other => other.to_string(),
    }
}
