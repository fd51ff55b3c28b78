use std::fmt;

use crate::filters::FilterKind;
use crate::session::{Phase, Studio};

/// Everything the screen shows, derived from a borrowed [`Studio`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioView {
    pub model: Option<String>,
    pub product: Option<String>,
    pub prompt: String,
    pub style: String,
    pub aspect_ratio: String,
    pub generate_enabled: bool,
    pub validation_message: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
    pub comparison: Option<Comparison>,
    /// Results come from the offline placeholder, not the model.
    pub demo: bool,
}

/// Original and generated image side by side, with the filter chain the
/// generated one is drawn through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub original: String,
    pub generated: String,
    pub css_filter: String,
    pub sliders: Vec<(FilterKind, u16)>,
    pub generated_at: String,
}

/// `status` is the current loading message, shown only while generating.
pub fn render(studio: &Studio, status: Option<&str>) -> StudioView {
    let generating = studio.phase() == Phase::Generating;
    let comparison = match (studio.result(), studio.model_preview()) {
        (Some(result), Some(original)) => Some(Comparison {
            original: original.to_string(),
            generated: result.data_uri(),
            css_filter: studio.filters().css(),
            sliders: FilterKind::ALL.iter().map(|k| (*k, studio.filters().get(*k))).collect(),
            generated_at: result.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }),
        _ => None,
    };
    StudioView {
        model: studio.model_label().map(str::to_string),
        product: studio.product_label().map(str::to_string),
        prompt: studio.prompt().to_string(),
        style: studio.style().to_string(),
        aspect_ratio: studio.aspect_ratio().to_string(),
        generate_enabled: studio.can_generate(),
        validation_message: if generating { None } else { studio.validation_message() },
        status: if generating { Some(status.unwrap_or(crate::status::message_at(0)).to_string()) } else { None },
        error: studio.failure().map(|f| f.message()),
        comparison,
        demo: studio.is_demo(),
    }
}

fn shorten(reference: &str) -> String {
    if reference.len() <= 60 || !reference.is_ascii() {
        reference.to_string()
    } else {
        format!("{}...[{} chars]", &reference[..48], reference.len())
    }
}

impl fmt::Display for StudioView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = |v: &Option<String>| v.clone().unwrap_or_else(|| "(none)".to_string());
        writeln!(f, "Model:   {}", slot(&self.model))?;
        writeln!(f, "Product: {}", slot(&self.product))?;
        writeln!(f, "Prompt:  {}", if self.prompt.is_empty() { "(empty)" } else { self.prompt.as_str() })?;
        writeln!(f, "Style:   {}   Aspect ratio: {}", self.style, self.aspect_ratio)?;
        writeln!(f, "[ Generate ] {}", if self.generate_enabled { "ready" } else { "disabled" })?;
        if let Some(message) = &self.validation_message {
            writeln!(f, "  ! {message}")?;
        }
        if let Some(status) = &self.status {
            writeln!(f, "  ~ {status}")?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "  x {error}")?;
        }
        if let Some(c) = &self.comparison {
            writeln!(f, "Original:  {}", shorten(&c.original))?;
            let marker = if self.demo { " (demo preview)" } else { "" };
            writeln!(f, "Generated: {} ({}){marker}", shorten(&c.generated), c.generated_at)?;
            for (kind, value) in &c.sliders {
                writeln!(f, "  {:<11}{:>4}%", kind.label(), value)?;
            }
            writeln!(f, "  filter: {}", c.css_filter)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EncodedAsset, GenerationResult};
    use crate::session::Failure;
    use pretty_assertions::assert_eq;

    fn ready() -> Studio {
        let mut studio = Studio::new();
        studio.select_stock_model(0).unwrap();
        studio.set_product_upload(vec![1, 2, 3], "image/png", "bag.png");
        studio.set_prompt("studio shot on white");
        studio
    }

    #[test]
    fn empty_studio_renders_disabled_with_message() {
        let view = render(&Studio::new(), None);
        assert!(!view.generate_enabled);
        assert_eq!(view.validation_message.as_deref(), Some("Please provide a model image, a product image and a prompt"));
        assert!(view.to_string().contains("[ Generate ] disabled"));
        assert!(view.comparison.is_none());
    }

    #[test]
    fn generating_shows_status_not_validation() {
        let mut studio = ready();
        studio.begin_generation().unwrap();
        let view = render(&studio, Some("Composing the scene..."));
        assert_eq!(view.status.as_deref(), Some("Composing the scene..."));
        assert_eq!(view.validation_message, None);
        assert!(!view.generate_enabled);
    }

    #[test]
    fn success_renders_side_by_side_with_neutral_sliders() {
        let mut studio = ready();
        studio.begin_generation().unwrap();
        studio.finish_generation(Ok(GenerationResult::new(EncodedAsset {
            content_type: "image/png".into(),
            data: "iVBORw0KGgo=".into(),
        })));

        let view = render(&studio, None);
        let comparison = view.comparison.unwrap();
        assert_eq!(comparison.generated, "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(comparison.original, crate::models::STOCK_MODELS[0].url);
        assert_eq!(
            comparison.sliders.iter().map(|(_, v)| *v).collect::<Vec<_>>(),
            vec![100, 100, 100, 0, 0]
        );
    }

    #[test]
    fn demo_result_is_marked() {
        let mut studio = ready();
        studio.set_demo(true);
        studio.begin_generation().unwrap();
        studio.finish_generation(Ok(GenerationResult::new(EncodedAsset {
            content_type: "image/png".into(),
            data: "iVBORw0KGgo=".into(),
        })));

        let view = render(&studio, None);
        assert!(view.demo);
        let generated = view.to_string().lines().find(|l| l.starts_with("Generated:")).unwrap().to_string();
        assert!(generated.ends_with("(demo preview)"), "{generated}");

        studio.set_demo(false);
        assert!(!render(&studio, None).to_string().contains("demo preview"));
    }

    #[test]
    fn failure_renders_message_without_image() {
        let mut studio = ready();
        studio.begin_generation().unwrap();
        studio.finish_generation(Err(Failure::Described("no image was generated".into())));

        let view = render(&studio, None);
        assert_eq!(view.error.as_deref(), Some("Generation failed: no image was generated"));
        assert!(view.comparison.is_none());
    }
}
