//! `concierge classify` — Explain the web-search decision for one message.

use concierge_config::WebSearchConfig;
use concierge_core::search::SearchOptions;
use concierge_pipeline::decision::{self, Decision, SearchQuery};
use concierge_pipeline::KnowledgeBase;

/// Everything the decision engine says about one message.
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct Classification {
    message: String,
    #[serde(flatten)]
    decision: Decision,
    query: Option<SearchQuery>,
    options: Option<SearchOptions>,
    priority: f64,
}

fn classify(message: &str, config: &WebSearchConfig) -> Classification {
    let decision = decision::decide(message, config);
    let (query, options) = if decision.search {
        (
            decision::extract_search_query(message),
            Some(decision::search_options(message, config)),
        )
    } else {
        (None, None)
    };

    Classification {
        message: message.to_string(),
        priority: decision::search_priority(message, config),
        decision,
        query,
        options,
    }
}

pub async fn run(message: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let base = KnowledgeBase::load(&config.knowledge);

    let result = classify(message, base.web_search());
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", report(&result));
    }

    Ok(())
}

fn report(c: &Classification) -> String {
    let mut out = format!("🔎 \"{}\"\n\n", c.message);

    if let Some(exclusion) = &c.decision.exclusion {
        out.push_str(&format!("  Excluded:   {exclusion}\n"));
    }

    if let Some(scoring) = &c.decision.scoring {
        for (category, score) in &scoring.category_scores {
            out.push_str(&format!("  {category:<18} {score:.1}\n"));
        }
        out.push_str(&format!(
            "  {:<18} {:.1} (threshold {:.1})\n",
            "total", scoring.total, scoring.threshold
        ));
    }

    out.push_str(&format!(
        "\n  Search:     {}\n",
        if c.decision.search { "yes" } else { "no" }
    ));
    if let Some(query) = &c.query {
        out.push_str(&format!("  Query:      {query}\n"));
    }
    if let Some(options) = &c.options {
        out.push_str(&format!(
            "  Options:    {} results, {} depth, {} excluded domains\n",
            options.max_results,
            options.depth.as_str(),
            options.exclude_domains.len()
        ));
    }
    out.push_str(&format!("  Priority:   {:.1}\n", c.priority));
    out
}
