//! Statistical intent model
//!
//! TF-IDF features (word unigrams, word bigrams and in-word character
//! bigrams) with one centroid per intent. Prediction is a temperature
//! softmax over the cosine similarity to each centroid.
//!
//! The model trains in milliseconds from the bundled corpus, so a missing
//! model file is never fatal: callers either train on startup or run with
//! rules only.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use kiosk_agent_config::constants::classification;
use kiosk_agent_core::{ClassificationResult, Intent};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TextProcessingError};
use crate::korean;

const BUNDLED_CORPUS: &str = include_str!("../../data/intent_training.json");

/// Generated examples per augmented intent
const AUGMENTATION_CAP: usize = 100;

/// A labelled utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub intent: Intent,
}

impl TrainingExample {
    pub fn new(text: impl Into<String>, intent: Intent) -> Self {
        Self {
            text: text.into(),
            intent,
        }
    }
}

/// Training corpus with augmentation templates. `{}` in a template is
/// replaced by a menu name or an option phrase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingCorpus {
    pub examples: Vec<TrainingExample>,
    #[serde(default)]
    pub order_templates: Vec<String>,
    #[serde(default)]
    pub option_templates: Vec<String>,
    #[serde(default)]
    pub menu_items: Vec<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

impl TrainingCorpus {
    /// Corpus compiled into the crate
    pub fn bundled() -> Result<Self> {
        Ok(serde_json::from_str(BUNDLED_CORPUS)?)
    }

    /// Labelled examples plus deterministic template augmentation.
    ///
    /// `extra_menu` (typically the live catalog names) is appended to the
    /// corpus menu list. Each augmented intent is capped and duplicates of
    /// existing texts are skipped.
    pub fn expand(&self, extra_menu: &[String]) -> Vec<TrainingExample> {
        let mut menu: Vec<String> = self.menu_items.clone();
        for name in extra_menu {
            if !menu.contains(name) {
                menu.push(name.clone());
            }
        }

        let mut seen: HashSet<String> = self.examples.iter().map(|e| e.text.clone()).collect();
        let mut all = self.examples.clone();
        for (templates, fillers, intent) in [
            (&self.order_templates, &menu, Intent::Order),
            (&self.option_templates, &self.options, Intent::OptionSelection),
        ] {
            let generated = augment(templates, fillers)
                .into_iter()
                .filter(|text| seen.insert(text.clone()))
                .take(AUGMENTATION_CAP)
                .map(|text| TrainingExample::new(text, intent));
            all.extend(generated);
        }
        all
    }
}

/// Interleave fillers over templates so that the first generated examples
/// already cover every filler and many templates.
fn augment(templates: &[String], fillers: &[String]) -> Vec<String> {
    if templates.is_empty() || fillers.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(templates.len() * fillers.len());
    for round in 0..templates.len() {
        for (i, filler) in fillers.iter().enumerate() {
            let template = &templates[(i + round) % templates.len()];
            out.push(template.replacen("{}", filler, 1));
        }
    }
    out
}

/// Feature strings of a preprocessed utterance
fn features(text: &str) -> Vec<String> {
    let processed = korean::preprocess(text);
    let words: Vec<&str> = processed.split_whitespace().collect();
    let mut out = Vec::new();

    for word in &words {
        out.push(format!("w:{}", word));
        let chars: Vec<char> = word.chars().collect();
        for pair in chars.windows(2) {
            out.push(format!("c:{}{}", pair[0], pair[1]));
        }
    }
    for pair in words.windows(2) {
        out.push(format!("b:{} {}", pair[0], pair[1]));
    }
    out
}

fn l2_normalize(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter_mut().for_each(|v| *v /= norm);
    }
}

/// Trained TF-IDF centroid model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentModel {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    centroids: Vec<(Intent, Vec<f32>)>,
    temperature: f32,
}

impl IntentModel {
    /// Train from labelled examples
    pub fn train(examples: &[TrainingExample], temperature: f32) -> Result<Self> {
        if examples.is_empty() {
            return Err(TextProcessingError::Training("no training examples".to_string()));
        }
        if temperature <= 0.0 {
            return Err(TextProcessingError::Training(format!(
                "softmax temperature must be positive, got {}",
                temperature
            )));
        }

        let docs: Vec<Vec<String>> = examples.iter().map(|e| features(&e.text)).collect();

        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut df: Vec<usize> = Vec::new();
        for doc in &docs {
            let unique: HashSet<&String> = doc.iter().collect();
            for feature in unique {
                let next = vocabulary.len();
                let index = *vocabulary.entry(feature.clone()).or_insert(next);
                if index == df.len() {
                    df.push(0);
                }
                df[index] += 1;
            }
        }

        let n = docs.len() as f32;
        let idf: Vec<f32> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f32)).ln() + 1.0)
            .collect();

        let mut model = Self {
            vocabulary,
            idf,
            centroids: Vec::new(),
            temperature,
        };

        let dim = model.idf.len();
        let mut sums: HashMap<Intent, (Vec<f32>, usize)> = HashMap::new();
        for (example, doc) in examples.iter().zip(&docs) {
            let vector = model.vectorize_features(doc);
            let (sum, count) = sums
                .entry(example.intent)
                .or_insert_with(|| (vec![0.0; dim], 0));
            for (index, value) in vector {
                sum[index] += value;
            }
            *count += 1;
        }

        // Fixed intent order keeps serialization and tie-breaking stable
        for intent in Intent::ALL {
            if let Some((mut sum, count)) = sums.remove(&intent) {
                sum.iter_mut().for_each(|v| *v /= count as f32);
                l2_normalize(&mut sum);
                model.centroids.push((intent, sum));
            }
        }

        tracing::debug!(
            examples = examples.len(),
            features = dim,
            intents = model.centroids.len(),
            "Trained intent model"
        );
        Ok(model)
    }

    /// Train from the bundled corpus, augmenting with `menu_names`
    pub fn train_bundled(menu_names: &[String], temperature: f32) -> Result<Self> {
        let corpus = TrainingCorpus::bundled()?;
        Self::train(&corpus.expand(menu_names), temperature)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let model: Self = serde_json::from_str(&content)?;
        if model.centroids.is_empty() || model.idf.len() != model.vocabulary.len() {
            return Err(TextProcessingError::Model(format!(
                "inconsistent model file {}",
                path.as_ref().display()
            )));
        }
        Ok(model)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Sparse, L2-normalized TF-IDF vector (sublinear tf)
    fn vectorize_features(&self, features: &[String]) -> Vec<(usize, f32)> {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for feature in features {
            if let Some(&index) = self.vocabulary.get(feature) {
                *counts.entry(index).or_insert(0) += 1;
            }
        }

        let mut entries: Vec<(usize, f32)> = counts
            .into_iter()
            .map(|(index, count)| (index, (1.0 + (count as f32).ln()) * self.idf[index]))
            .collect();
        let norm = entries.iter().map(|(_, v)| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            entries.iter_mut().for_each(|(_, v)| *v /= norm);
        }
        entries
    }

    /// Probability per intent, in centroid order
    pub fn probabilities(&self, text: &str) -> Vec<(Intent, f32)> {
        let vector = self.vectorize_features(&features(text));
        let logits: Vec<f32> = self
            .centroids
            .iter()
            .map(|(_, centroid)| {
                let cosine: f32 = vector.iter().map(|(i, v)| v * centroid[*i]).sum();
                cosine / self.temperature
            })
            .collect();

        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f32 = exps.iter().sum();

        self.centroids
            .iter()
            .zip(exps)
            .map(|((intent, _), e)| (*intent, e / total))
            .collect()
    }

    /// Most probable intent
    pub fn predict(&self, text: &str) -> ClassificationResult {
        self.probabilities(text)
            .into_iter()
            .fold(None, |best: Option<(Intent, f32)>, (intent, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((intent, p)),
            })
            .map(|(intent, p)| ClassificationResult::statistical(intent, p))
            .unwrap_or_else(ClassificationResult::unknown)
    }
}

impl Default for IntentModel {
    /// Untrained model: uniform over nothing, predicts unknown
    fn default() -> Self {
        Self {
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            centroids: Vec::new(),
            temperature: classification::SOFTMAX_TEMPERATURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_set() -> Vec<TrainingExample> {
        vec![
            TrainingExample::new("아메리카노 주세요", Intent::Order),
            TrainingExample::new("카페라떼 두잔 주세요", Intent::Order),
            TrainingExample::new("아이스로 해주세요", Intent::OptionSelection),
            TrainingExample::new("라지 사이즈로 변경해주세요", Intent::OptionSelection),
            TrainingExample::new("안녕하세요", Intent::Greeting),
            TrainingExample::new("반갑습니다", Intent::Greeting),
            TrainingExample::new("안녕히 가세요", Intent::Farewell),
            TrainingExample::new("감사합니다", Intent::Farewell),
            TrainingExample::new("화장실 어디예요", Intent::Casual),
            TrainingExample::new("와이파이 있나요", Intent::Casual),
        ]
    }

    #[test]
    fn test_train_small_set() {
        let model = IntentModel::train(&small_set(), 0.1).unwrap();
        assert_eq!(model.predict("카페라떼 주세요").intent, Intent::Order);
        assert_eq!(model.predict("감사합니다").intent, Intent::Farewell);
        assert_eq!(model.predict("화장실은 어디에").intent, Intent::Casual);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let model = IntentModel::train(&small_set(), 0.1).unwrap();
        let probs = model.probabilities("아이스 아메리카노");
        assert_eq!(probs.len(), 5);
        let total: f32 = probs.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_unknown_words_are_uniform() {
        let model = IntentModel::train(&small_set(), 0.1).unwrap();
        let result = model.predict("zzz");
        assert!((result.confidence - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_bundled_corpus() {
        let corpus = TrainingCorpus::bundled().unwrap();
        assert!(corpus.examples.len() > 100);

        let expanded = corpus.expand(&["티라미수".to_string()]);
        let orders = expanded.iter().filter(|e| e.intent == Intent::Order).count();
        let bundled_orders = corpus
            .examples
            .iter()
            .filter(|e| e.intent == Intent::Order)
            .count();
        assert_eq!(orders, bundled_orders + AUGMENTATION_CAP);
    }

    #[test]
    fn test_bundled_model_predictions() {
        let model = IntentModel::train_bundled(&[], 0.1).unwrap();
        assert_eq!(model.predict("아메리카노 두잔 주세요").intent, Intent::Order);
        assert_eq!(model.predict("안녕하세요").intent, Intent::Greeting);
        assert_eq!(model.predict("휘핑크림 추가해주세요").intent, Intent::OptionSelection);
    }

    #[test]
    fn test_save_and_load() {
        let model = IntentModel::train(&small_set(), 0.1).unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        model.save(file.path()).unwrap();

        let loaded = IntentModel::load(file.path()).unwrap();
        assert_eq!(loaded.vocabulary_size(), model.vocabulary_size());
        assert_eq!(
            loaded.predict("반갑습니다").intent,
            model.predict("반갑습니다").intent
        );
    }

    #[test]
    fn test_corrupt_model_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{not json").unwrap();
        assert!(IntentModel::load(file.path()).is_err());
        assert!(IntentModel::load("/nonexistent/model.json").is_err());
    }

    #[test]
    fn test_empty_training_rejected() {
        assert!(IntentModel::train(&[], 0.1).is_err());
        assert!(IntentModel::train(&small_set(), 0.0).is_err());
    }
}
