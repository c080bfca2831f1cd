use tracing::info;

/// The single selected region, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    current: Option<String>,
}

impl Selection {
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Returns true when the selection actually changed.
    pub fn select(&mut self, name: Option<String>) -> bool {
        if self.current == name {
            return false;
        }
        info!("Selection: {} -> {}", self.label(), name.as_deref().unwrap_or("none"));
        self.current = name;
        true
    }

    pub fn clear(&mut self) -> bool {
        self.select(None)
    }

    pub fn label(&self) -> &str {
        self.current.as_deref().unwrap_or("none")
    }
}
