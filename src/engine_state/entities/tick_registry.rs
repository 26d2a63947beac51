use super::EntityManager;

/// What a tick callback knows about the current tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickInfo {
    /// Number of ticks run before this one.
    pub tick: u64,
    /// Duration of the last render iteration, in seconds.
    pub frame_time: f64,
}

/// A callback run once per world tick.
pub type TickFunction = Box<dyn FnMut(&mut EntityManager, TickInfo) + Send>;

/// Named global tick callbacks, run in registration order.
#[derive(Default)]
pub struct TickRegistry {
    functions: Vec<(String, TickFunction)>,
}

impl TickRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `function` under `name`, replacing a callback with the same name in place.
    pub fn add(&mut self, name: &str, function: TickFunction) {
        match self.functions.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = function,
            None => self.functions.push((name.to_owned(), function)),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.functions.len();
        self.functions.retain(|(existing, _)| existing != name);
        self.functions.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.iter().any(|(existing, _)| existing == name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Runs every callback once.
    pub fn run(&mut self, entities: &mut EntityManager, info: TickInfo) {
        for (_, function) in self.functions.iter_mut() {
            function(entities, info);
        }
    }
}
