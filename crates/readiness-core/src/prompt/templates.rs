//! Prompt text blocks.
//!
//! Every block is Spanish, matching the language the oracle answers in and
//! the keywords the classifier expects back.

/// Role framing shared by both modes.
pub const ROLE_FRAMING: &str = "Actúa como un evaluador experto de madurez tecnológica (TRL) siguiendo rigurosamente la metodología oficial de evaluación por matriz de evidencias.";

/// Task line for a single document.
pub const DOCUMENT_TASK: &str = "Tu tarea es analizar el PDF proporcionado y generar un informe TRL exhaustivo, objetivo y completamente basado en evidencias explícitas.";

/// Task lines for a project; `{project_id}` is substituted.
pub const PROJECT_TASK: &str = "Analiza todas las evidencias adjuntas correspondientes al Proyecto ID: {project_id}.
Tu objetivo es determinar el TRL GLOBAL del proyecto basándote en el conjunto de todos estos documentos.";

pub const BANNER: &str = "====================================================";

pub const RULES_TITLE: &str = "REGLAS ESTRICTAS DE EVALUACIÓN (OBLIGATORIAS)";

/// Evaluation rules in the order the oracle must apply them.
pub const EVALUATION_RULES: &[&str] = &[
    "SOLO PUEDES ASIGNAR PUNTOS A EVIDENCIAS QUE coincidan EXACTAMENTE con los criterios de la MATRIZ DE EVIDENCIAS adjunta.",
    "NO CONFUNDAS descripciones textuales con evidencias reales.",
    "VALIDACIÓN SECUENCIAL: NO evalúes un TRL superior si el anterior no está validado.",
    "EL TRL REAL es el último nivel completamente validado.",
];

pub const RESPONSE_FORMAT_TITLE: &str = "FORMATO DE RESPUESTA";

/// Line markers the answer must use so it can be rendered.
pub const RESPONSE_FORMAT: &str = "Estructura la respuesta con estas marcas, una por línea:
NIVEL TRL <n> - EVALUACION
CRITERIO: <criterio de la matriz>
EVIDENCIA: <fragmento textual encontrado>
PUNTAJE: <puntos obtenidos> / CUMPLE: VALIDADO o NO VALIDADO
TRL REAL: TRL <n>
RECOMENDACIONES
- <recomendación concreta>";

pub const ANALYSIS_TITLE: &str = "INSTRUCCIONES DE ANÁLISIS:";

pub const ANALYSIS_STEPS: &[&str] = &[
    "Determinar si es documento tecnológico.",
    "Identificar evidencias encontradas (fragmentos textuales).",
    "Evaluación TRL nivel por nivel.",
    "Determinación del TRL Real.",
    "Recomendaciones para avanzar.",
];

pub const EVIDENCE_LIST_TITLE: &str = "Evidencias adjuntas:";

pub const PROJECT_INSTRUCTIONS_TITLE: &str = "Instrucciones adicionales:";

pub const PROJECT_INSTRUCTIONS: &[&str] = &[
    "Considera la información de TODOS los archivos para validar los criterios.",
    "Si una evidencia falta en un archivo pero está en otro, se considera válida para el proyecto.",
];

pub const DOCUMENT_CLOSING: &str = "Analiza el PDF adjunto línea por línea:";

pub const PROJECT_CLOSING: &str = "Analiza el conjunto de evidencias adjuntas:";
