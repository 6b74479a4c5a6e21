//! Classification prompt rendering.

use crate::models::{Batch, PaperRecord};

/// System message sent with every classification request.
pub const SYSTEM_PROMPT: &str = "You are an expert neural recording methods curator. \
Respond ONLY with JSON exactly as requested. No commentary.";

/// User message template; `{items}` is replaced by the rendered batch.
pub const USER_TEMPLATE: &str = r#"You will receive a batch of paper metadata (id, title, first author, year, abstract).
For each paper, decide if the full paper likely contains useful information about state-of-the-art neural recording methods.
Focus ONLY on invasive methods: penetrating electrodes, ECoG arrays, calcium or voltage imaging (including miniscope/mesoscope/two-photon/three-photon/light-sheet), functional ultrasound (typically requires craniotomy). Ignore non-invasive EEG/MEG/fMRI unless clearly paired with invasive recordings.

Promising criteria (any of these counts):
1) Methods development enabling large-scale recordings (new hardware/indicators/arrays/optics/fUS pipeline).
2) Evidence of large or “massive” datasets.
3) Study only feasible with large datasets.
4) Mentions of advances in: dataset size; number of probes; neurons per session; % of brain recorded (whole-brain).
5) Clearly demonstrates unusually large-scale invasive recordings (e.g., many probes, thousands of neurons, or near whole-brain coverage) even if using existing technologies, including cases where the abstract explicitly uses phrases like “large-scale recording” or similar even without giving exact numbers or hardware details.

If unclear, err on the side of NOT promising.

For each paper, return an object with:
- id: the input id
- summary: one-line reason (from abstract) why it is or is not promising
- promising: true/false
- paper_type: methods | results | review | opinion | other | "N/A"
- species: human | macaque | tree shrew | rat | mouse | zebrafish | drosophila | C Elegans | multiple | other | "N/A"
- technology: specific neural recording method; "N/A" if not stated
- yield: number of neurons per session if available; else "N/A"
- chronic: true/false if the technology is meant for chronic implantation; "N/A" if unknown

Always include all fields above. Use "N/A" when a field is not inferable from the abstract. Do not invent numbers.

Return a JSON array (no prose) where each element corresponds to one input paper, in the same order.

INPUT PAPERS:
{items}
"#;

/// Render one paper as an indented YAML-like block.
#[must_use]
pub fn render_item(paper: &PaperRecord) -> String {
    format!(
        "- id: {}\n  title: {}\n  first_author: {}\n  year: {}\n  abstract: {}",
        paper.id, paper.title, paper.first_author, paper.year, paper.r#abstract
    )
}

/// Build the user message for a batch, items in batch order.
#[must_use]
pub fn user_prompt(batch: &Batch) -> String {
    let items = batch.items.iter().map(render_item).collect::<Vec<_>>().join("\n\n");
    USER_TEMPLATE.replace("{items}", &items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Year;

    fn paper(id: &str, year: Year) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: format!("Title {id}"),
            first_author: "Doe".to_string(),
            year,
            r#abstract: "We recorded {many} neurons.".to_string(),
        }
    }

    #[test]
    fn test_render_item_fields() {
        let text = render_item(&paper("W1", Year::Known(2023)));
        assert_eq!(
            text,
            "- id: W1\n  title: Title W1\n  first_author: Doe\n  year: 2023\n  abstract: We recorded {many} neurons."
        );
    }

    #[test]
    fn test_user_prompt_keeps_order_and_braces() {
        let batch =
            Batch { start_index: 0, items: vec![paper("W2", Year::Unknown), paper("W1", Year::Known(2020))] };
        let prompt = user_prompt(&batch);

        let first = prompt.find("- id: W2").unwrap();
        let second = prompt.find("- id: W1").unwrap();
        assert!(first < second);
        assert!(prompt.contains("year: N/A"));
        assert!(prompt.contains("{many}"));
        assert!(!prompt.contains("{items}"));
        assert!(prompt.ends_with("abstract: We recorded {many} neurons.\n"));
    }

    #[test]
    fn test_template_keeps_typographic_quotes() {
        assert!(USER_TEMPLATE.contains("large or “massive” datasets"));
        assert!(USER_TEMPLATE.contains("phrases like “large-scale recording” or similar"));
        assert!(USER_TEMPLATE.contains("other | \"N/A\""));
    }
}
