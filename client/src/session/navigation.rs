//! Hook through which the session asks the host UI to change page.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Authenticated landing area.
    Dashboard,
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: Destination);
}

/// Navigator for hosts without pages; only logs the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, destination: Destination) {
        tracing::info!("Navigation requested: {:?}", destination);
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingNavigator {
    pub visited: std::sync::Mutex<Vec<Destination>>,
}

#[cfg(test)]
impl RecordingNavigator {
    pub fn visited(&self) -> Vec<Destination> {
        self.visited.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: Destination) {
        self.visited.lock().unwrap().push(destination);
    }
}
