use miette::{MietteSpanContents, SourceCode, SpanContents};

/// One input line together with the name it is reported under
#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    pub code: String,
}

impl Source {
    pub fn new(name: String, code: String) -> Self {
        Self { name, code }
    }
}

impl SourceCode for Source {
    fn read_span<'a>(
        &'a self,
        span: &miette::SourceSpan,
        context_lines_before: usize,
        context_lines_after: usize,
    ) -> Result<Box<dyn SpanContents<'a> + 'a>, miette::MietteError> {
        let contents = self
            .code
            .read_span(span, context_lines_before, context_lines_after)?;
        Ok(Box::new(MietteSpanContents::new_named(
            self.name.clone(),
            contents.data(),
            *contents.span(),
            contents.line(),
            contents.column(),
            contents.line_count(),
        )))
    }
}
