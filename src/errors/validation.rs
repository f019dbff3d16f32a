use thiserror::Error;

/// Client-side precondition failures. None of these ever reach the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Por favor, selecciona un archivo para subir.")]
    MissingFile,

    #[error("El archivo seleccionado no tiene nombre.")]
    MissingFileName,

    #[error("Extensión de archivo no permitida ({filename}). Extensiones permitidas: {allowed}")]
    DisallowedExtension { filename: String, allowed: String },

    #[error("El archivo {0} está vacío.")]
    EmptyFile(String),

    #[error("El archivo {filename} es demasiado grande ({size} bytes, máximo {max} bytes).")]
    FileTooLarge {
        filename: String,
        size: usize,
        max: usize,
    },

    #[error("Por favor, selecciona una cepa.")]
    MissingStrain,

    #[error("Por favor, selecciona un tipo de análisis.")]
    MissingAnalysisType,
}
