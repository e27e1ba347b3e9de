/// Model selector meaning "walk the ranked free-model list".
pub const AUTO_FREE_MODEL: &str = "auto-free";

/// Ordered model identifiers, highest priority first. Blank entries are
/// dropped and later duplicates lose to the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelRank {
    models: Vec<String>,
}

impl ModelRank {
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ranked: Vec<String> = Vec::new();
        for model in models {
            let model = model.as_ref().trim();
            if model.is_empty() || ranked.iter().any(|seen| seen == model) {
                continue;
            }
            ranked.push(model.to_string());
        }
        Self { models: ranked }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }
}

pub fn is_auto_free(model: &str) -> bool {
    model.trim().eq_ignore_ascii_case(AUTO_FREE_MODEL)
}
