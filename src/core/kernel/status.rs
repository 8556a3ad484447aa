use core::fmt;
use spin::Mutex;

const MAX_COMPONENTS: usize = 8;

/// Kernel initialization status tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed(&'static str),
}

/// Kernel component status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentStatus {
    pub name: &'static str,
    pub status: InitStatus,
}

impl ComponentStatus {
    pub const fn new(name: &'static str) -> Self {
        Self { name, status: InitStatus::NotStarted }
    }

    pub fn set_status(&mut self, status: InitStatus) {
        self.status = status;
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.status, InitStatus::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, InitStatus::Failed(_))
    }
}

/// Fixed-capacity list of boot components; there is no heap this early.
pub struct StatusRegistry {
    slots: [Option<ComponentStatus>; MAX_COMPONENTS],
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusRegistry {
    pub const fn new() -> Self {
        Self { slots: [None; MAX_COMPONENTS] }
    }

    /// Returns `false` if the name is already known or the registry is full.
    pub fn register(&mut self, name: &'static str) -> bool {
        if self.find_mut(name).is_some() {
            return false;
        }
        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(ComponentStatus::new(name));
                true
            }
            None => false,
        }
    }

    pub fn update(&mut self, name: &'static str, status: InitStatus) {
        if let Some(component) = self.find_mut(name) {
            component.set_status(status);
        }
    }

    pub fn get(&self, name: &str) -> Option<ComponentStatus> {
        self.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = ComponentStatus> + '_ {
        self.slots.iter().flatten().copied()
    }

    pub fn all_ready(&self) -> bool {
        self.iter().next().is_some() && self.iter().all(|c| c.is_complete())
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut ComponentStatus> {
        self.slots.iter_mut().flatten().find(|c| c.name == name)
    }
}

static INIT_STATUS: Mutex<StatusRegistry> = Mutex::new(StatusRegistry::new());

/// Track kernel component initialization
pub fn register_component(name: &'static str) -> bool {
    INIT_STATUS.lock().register(name)
}

/// Update component status
pub fn update_component_status(name: &'static str, status: InitStatus) {
    INIT_STATUS.lock().update(name, status);
}

pub fn component_status(name: &str) -> Option<ComponentStatus> {
    INIT_STATUS.lock().get(name)
}

/// Calls `f` for every registered component, in registration order.
pub fn for_each_component(mut f: impl FnMut(ComponentStatus)) {
    INIT_STATUS.lock().iter().for_each(&mut f);
}

/// Check if all components are initialized
pub fn all_components_ready() -> bool {
    INIT_STATUS.lock().all_ready()
}

impl fmt::Display for InitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStatus::NotStarted => write!(f, "Not Started"),
            InitStatus::InProgress => write!(f, "In Progress"),
            InitStatus::Completed => write!(f, "Completed"),
            InitStatus::Failed(err) => write!(f, "Failed: {}", err),
        }
    }
}
