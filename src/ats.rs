//! Resume to job-description match scoring.
//!
//! TF-IDF over the two documents with English stop words removed, then the
//! cosine similarity of the two vectors as a percentage.
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("valid token regex"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ENGLISH_STOP_WORDS.split_whitespace().collect()
});

const ENGLISH_STOP_WORDS: &str = "
a about above across after afterwards again against all almost alone along already also
although always am among amongst amoungst amount an and another any anyhow anyone anything
anyway anywhere are around as at back be became because become becomes becoming been before
beforehand behind being below beside besides between beyond bill both bottom but by call can
cannot cant co con could couldnt cry de describe detail do done down due during each eg eight
either eleven else elsewhere empty enough etc even ever every everyone everything everywhere
except few fifteen fifty fill find fire first five for former formerly forty found four from
front full further get give go had has hasnt have he hence her here hereafter hereby herein
hereupon hers herself him himself his how however hundred i ie if in inc indeed interest into
is it its itself keep last latter latterly least less ltd made many may me meanwhile might mill
mine more moreover most mostly move much must my myself name namely neither never nevertheless
next nine no nobody none noone nor not nothing now nowhere of off often on once one only onto
or other others otherwise our ours ourselves out over own part per perhaps please put rather re
same see seem seemed seeming seems serious several she should show side since sincere six sixty
so some somehow someone something sometime sometimes somewhere still such system take ten than
that the their them themselves then thence there thereafter thereby therefore therein thereupon
these they thick thin third this those though three through throughout thru thus to together too
top toward towards twelve twenty two un under until up upon us very via was we well were what
whatever when whence whenever where whereafter whereas whereby wherein whereupon wherever whether
which while whither who whoever whole whom whose why will with within without would yet you your
yours yourself yourselves
";

fn term_counts(text: &str) -> HashMap<String, f64> {
    let lowered = text.to_lowercase();
    let mut counts = HashMap::new();
    for m in TOKEN.find_iter(&lowered) {
        let term = m.as_str();
        if STOP_WORDS.contains(term) {
            continue;
        }
        *counts.entry(term.to_string()).or_insert(0.0) += 1.0;
    }
    counts
}

/// Weight counts by smoothed idf and scale to unit length.
fn tfidf(counts: &HashMap<String, f64>, df: &HashMap<&str, f64>, n_docs: f64) -> HashMap<String, f64> {
    let mut weights: HashMap<String, f64> = counts
        .iter()
        .map(|(term, tf)| {
            let d = df.get(term.as_str()).copied().unwrap_or(0.0);
            let idf = ((1.0 + n_docs) / (1.0 + d)).ln() + 1.0;
            (term.clone(), tf * idf)
        })
        .collect();
    let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        weights.values_mut().for_each(|w| *w /= norm);
    }
    weights
}

/// Percentage match between a resume and a job description, two decimals.
/// Either input empty, or no shared vocabulary, gives `0.0`.
pub fn calculate_ats_score(resume_text: &str, job_description: &str) -> f64 {
    if resume_text.is_empty() || job_description.is_empty() {
        return 0.0;
    }
    let docs = [term_counts(resume_text), term_counts(job_description)];
    let mut df: HashMap<&str, f64> = HashMap::new();
    for doc in &docs {
        for term in doc.keys() {
            *df.entry(term.as_str()).or_insert(0.0) += 1.0;
        }
    }
    let n = docs.len() as f64;
    let a = tfidf(&docs[0], &df, n);
    let b = tfidf(&docs[1], &df, n);

    let dot: f64 = a
        .iter()
        .filter_map(|(term, wa)| b.get(term).map(|wb| wa * wb))
        .sum();
    let score = (dot * 100.0).clamp(0.0, 100.0);
    (score * 100.0).round() / 100.0
}
