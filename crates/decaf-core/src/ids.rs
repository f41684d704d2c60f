/// A monotonic counter used for the per-kind ids of §3: one instance each
/// for fields, methods, and constructors. Never reset within a compilation,
/// which is what gives every record a program-wide unique id within its
/// kind (Testable Property 2).
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    next: u32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Field/method/constructor ids start at 1, not 0 (§3).
    pub fn starting_at_one() -> Self {
        Self { next: 1 }
    }

    pub fn next(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}
