//! Translated user-facing strings for exports and notifications.
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_LANGUAGE: &str = "en";

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid HTML tag regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    /// Appended to an export when the search matched more rows than were fetched.
    DataBetaSearchLimit,
    /// Body of the message telling a requester their export is ready.
    FileReadyForDownload,
}

fn template(language: &str, key: MessageKey) -> Option<&'static str> {
    use MessageKey::*;
    let text = match (language, key) {
        ("en", DataBetaSearchLimit) => {
            "<strong>Note:</strong> this download is limited to the first %{count} results. Refine your search to see the rest."
        }
        ("en", FileReadyForDownload) => {
            "The data file you requested is ready for download at <a href=\"%{file}\">%{file}</a> (search: %{query})."
        }
        ("fr", DataBetaSearchLimit) => {
            "<strong>Remarque :</strong> ce téléchargement est limité aux %{count} premiers résultats. Affinez votre recherche pour voir les autres."
        }
        ("fr", FileReadyForDownload) => {
            "Le fichier de données demandé est prêt à être téléchargé : <a href=\"%{file}\">%{file}</a> (recherche : %{query})."
        }
        ("es", DataBetaSearchLimit) => {
            "<strong>Nota:</strong> esta descarga se limita a los primeros %{count} resultados. Refine su búsqueda para ver el resto."
        }
        ("es", FileReadyForDownload) => {
            "El archivo de datos que solicitó está listo para descargar en <a href=\"%{file}\">%{file}</a> (búsqueda: %{query})."
        }
        ("de", DataBetaSearchLimit) => {
            "<strong>Hinweis:</strong> dieser Download ist auf die ersten %{count} Ergebnisse beschränkt. Verfeinern Sie Ihre Suche, um den Rest zu sehen."
        }
        ("de", FileReadyForDownload) => {
            "Die angeforderte Datendatei steht unter <a href=\"%{file}\">%{file}</a> zum Download bereit (Suche: %{query})."
        }
        _ => return None,
    };
    Some(text)
}

/// Looks up `key` for an ISO 639-1 language code, falling back to English,
/// and fills `%{name}` placeholders from `args`.
pub fn translate(language: &str, key: MessageKey, args: &[(&str, &str)]) -> String {
    let language = language.trim().to_lowercase();
    let language = language.split(['-', '_']).next().unwrap_or(DEFAULT_LANGUAGE);
    let text = template(language, key)
        .or_else(|| template(DEFAULT_LANGUAGE, key))
        .unwrap_or_default();

    args.iter().fold(text.to_string(), |acc, (name, value)| {
        acc.replace(&format!("%{{{}}}", name), value)
    })
}

/// Removes markup so a translated string can sit in a plain-text cell.
pub fn sanitize_html(text: &str) -> String {
    let stripped = HTML_TAG.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
