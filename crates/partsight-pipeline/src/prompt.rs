//! Prompts for the model-backed stages
//!
//! The OCR prompt asks for nothing but characters. The structuring prompt
//! carries only text, never an image, and forbids inventing values. The
//! enrichment prompt names every protected key so the model knows what it
//! must leave alone (the merge step enforces it regardless).

use partsight_domain::{QuantityEstimate, RawLabelText, SpecField, SpecSheet};
use std::collections::BTreeSet;

/// Prompt for the transcription-only vision call
pub const OCR_PROMPT: &str = r#"Transcribe every piece of text visible on the label(s) in the image(s), verbatim, line by line.

Rules:
- Copy characters exactly as printed, including dashes, slashes and spacing
- Watch for look-alike characters: 8/B, 1/l/I, 0/O, S/5, G/6, C/G
- If a character cannot be read with certainty, write [illegible] in its place
- Do not interpret, summarize, translate or explain anything
- Do not output JSON or markdown, only the transcribed lines"#;

const STRUCTURE_INSTRUCTIONS: &str = r#"Organize the label text below into a JSON object. You have NOT seen the item; the text is all you know.

Rules:
- Use only values that appear in the text; never guess or invent a value
- Use null for anything the text does not state
- "model" is the manufacturer part number exactly as printed (e.g. HMT451U6AFR8A-PB)
- "visual_count" is how many identical labels/units the text describes (1 if unclear)
- Part-number hints: HMT/HMA/HMCG = SK hynix, M471/M378/M393 = Samsung,
  KVR/KF = Kingston, MTA/MTC/MT36 = Micron, CT = Crucial
- Memory speed ratings map to generations: PC2 = DDR2, PC3/PC3L = DDR3,
  PC4 = DDR4, PC5 = DDR5 (e.g. PC3-12800 = DDR3-1600)"#;

const SCHEMA: &str = r#"{
  "manufacturer": "string or null",
  "model": "part number as printed, or null",
  "category": "RAM | SSD | HDD | CPU | GPU | other",
  "visual_count": 1,
  "notes": "anything else worth knowing, or null",
  "suggested_title": "short neutral product title, or null",
  "specs": {
    "capacity": "e.g. 8GB",
    "generation": "e.g. DDR4",
    "speed": "e.g. PC4-25600",
    "form_factor": "e.g. SODIMM",
    "voltage": "e.g. 1.2V"
  }
}"#;

const FALLBACK_INSTRUCTIONS: &str = r#"Identify the component shown in the image(s) and describe it as a JSON object.

Rules:
- Read the label carefully before answering; the part number matters most
- Use only what is visible; use null for anything you cannot read
- "visual_count" is how many identical units are visible in the image(s)"#;

const ENRICH_INSTRUCTIONS: &str = r#"Complete the specification of the component below.

The protected fields were decoded from the part number and are correct. Do not change, restate or contradict them.
Fill in only fields that are missing (for example cas_latency, pin_count, ranks), write a one or two sentence description, and suggest a neutral product title.
If you do not know this part, reply with the single word UNKNOWN."#;

const OUTPUT_FORMAT_REMINDER: &str =
    "Remember: Return ONLY valid JSON, no markdown code blocks, no explanations.";

/// Build the structuring prompt around a transcription
pub fn structure_prompt(text: &RawLabelText) -> String {
    let mut prompt = String::new();
    prompt.push_str(STRUCTURE_INSTRUCTIONS);
    prompt.push_str("\n\nLabel text:\n---\n");
    prompt.push_str(text.as_str().trim());
    prompt.push_str("\n---\n\nOutput format:\n");
    prompt.push_str(SCHEMA);
    prompt.push_str("\n\n");
    prompt.push_str(OUTPUT_FORMAT_REMINDER);
    prompt
}

/// Build the single-call fallback prompt
///
/// Whatever the OCR stage managed to read is passed along as a hint. With
/// nothing at all, the model is told to transcribe before it answers.
pub fn fallback_prompt(partial: Option<&RawLabelText>) -> String {
    let mut prompt = String::new();
    prompt.push_str(FALLBACK_INSTRUCTIONS);
    prompt.push_str("\n\n");

    match partial.map(|t| t.as_str().trim()).filter(|t| !t.is_empty()) {
        Some(text) => {
            prompt.push_str("An earlier pass read this from the label (it may be incomplete or wrong):\n---\n");
            prompt.push_str(text);
            prompt.push_str("\n---\n\n");
        }
        None => {
            prompt.push_str(
                "First read every line of text on the label to yourself, then fill in the fields.\n\n",
            );
        }
    }

    prompt.push_str("Output format:\n");
    prompt.push_str(SCHEMA);
    prompt.push_str("\n\n");
    prompt.push_str(OUTPUT_FORMAT_REMINDER);
    prompt
}

/// Builds the enrichment prompt
pub struct EnrichmentPrompt<'a> {
    spec: &'a SpecSheet,
    protected: Option<&'a BTreeSet<String>>,
    quantity: QuantityEstimate,
}

impl<'a> EnrichmentPrompt<'a> {
    /// Create a prompt for the merged spec
    pub fn new(spec: &'a SpecSheet) -> Self {
        Self {
            spec,
            protected: None,
            quantity: QuantityEstimate::single(),
        }
    }

    /// Mark keys the model must not touch
    pub fn with_protected(mut self, protected: &'a BTreeSet<String>) -> Self {
        self.protected = Some(protected);
        self
    }

    /// Tell the model how many units the listing covers
    pub fn with_quantity(mut self, quantity: QuantityEstimate) -> Self {
        self.quantity = quantity;
        self
    }

    fn is_protected(&self, key: &str) -> bool {
        self.protected.is_some_and(|p| p.contains(key))
    }

    /// Build the complete prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str(ENRICH_INSTRUCTIONS);
        prompt.push_str("\n\n");

        let protected: Vec<_> = self.spec.iter().filter(|(k, _)| self.is_protected(k)).collect();
        if !protected.is_empty() {
            prompt.push_str("Protected fields (decoded, do not change):\n");
            for (key, value) in &protected {
                prompt.push_str(&format!("- {}: {}\n", key, value));
            }
            prompt.push('\n');
        }

        let open: Vec<_> = self.spec.iter().filter(|(k, _)| !self.is_protected(k)).collect();
        if !open.is_empty() {
            prompt.push_str("Other known fields:\n");
            for (key, value) in &open {
                prompt.push_str(&format!("- {}: {}\n", key, value));
            }
            prompt.push('\n');
        }

        if self.quantity.is_multiple() {
            prompt.push_str(&format!(
                "The listing covers {} identical units.",
                self.quantity.value()
            ));
            if let Some(total) = self
                .spec
                .field(SpecField::Capacity)
                .and_then(crate::title::capacity_gb)
            {
                prompt.push_str(&format!(
                    " Total capacity: {}GB.",
                    total * u64::from(self.quantity.value())
                ));
            }
            prompt.push_str("\n\n");
        }

        prompt.push_str(
            r#"Output format:
{
  "specs": { "missing_field": "value" },
  "description": "one or two sentences",
  "title": "neutral product title"
}"#,
        );
        prompt.push_str("\n\n");
        prompt.push_str(OUTPUT_FORMAT_REMINDER);
        prompt
    }
}
