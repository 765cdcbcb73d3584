//! Emission scopes and deferred statements.
//!
//! The emitter pushes a scope for every block it opens. Each scope owns
//! a queue of deferred statements, newest first, which is flushed when
//! the block closes or unwound when a `return` leaves it.

/// A deferred statement, rendered at the depth where it was deferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deferred {
    pub text: String,
    pub depth: usize,
}

#[derive(Debug, Default)]
struct Scope {
    deferred: Vec<Deferred>,
    /// Function bodies stop `return` unwinding.
    function: bool,
}

#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        ScopeStack::new()
    }
}

impl ScopeStack {
    /// A stack holding only the file scope, at depth 1.
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![Scope::default()],
        }
    }

    /// Nesting depth; the file scope is depth 1.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn indent(&self) -> String {
        indent(self.depth())
    }

    pub fn push(&mut self, function: bool) {
        self.scopes.push(Scope {
            deferred: Vec::new(),
            function,
        });
    }

    /// Pops the innermost scope, returning its queue newest first.
    /// The file scope is never popped.
    pub fn pop(&mut self) -> Vec<Deferred> {
        if self.scopes.len() == 1 {
            return Vec::new();
        }
        self.scopes
            .pop()
            .map(|scope| scope.deferred)
            .unwrap_or_default()
    }

    /// Queue `text` on the innermost scope. Later deferrals run first.
    pub fn defer(&mut self, text: String) {
        let depth = self.depth();
        if let Some(scope) = self.scopes.last_mut() {
            scope.deferred.insert(0, Deferred { text, depth });
        }
    }

    /// Deferred statements a `return` has to run: every open scope from
    /// the innermost outwards, up to and including the nearest function
    /// scope. The queues stay in place for the blocks' own ends.
    pub fn unwind(&self) -> Vec<&Deferred> {
        let mut pending = Vec::new();
        for scope in self.scopes.iter().rev() {
            pending.extend(scope.deferred.iter());
            if scope.function {
                break;
            }
        }
        pending
    }

    /// Queue of the innermost scope, newest first.
    pub fn current(&self) -> &[Deferred] {
        self.scopes
            .last()
            .map(|scope| scope.deferred.as_slice())
            .unwrap_or(&[])
    }
}

pub fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Moves every line of `text` from depth `from` to depth `to`.
pub fn reindent(text: &str, from: usize, to: usize) -> String {
    let old = indent(from);
    let new = indent(to);
    text.split('\n')
        .map(|line| match line.strip_prefix(old.as_str()) {
            Some(rest) => format!("{new}{rest}"),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_scope_is_depth_one() {
        let mut scopes = ScopeStack::new();
        assert_eq!(scopes.depth(), 1);
        assert_eq!(scopes.indent(), "  ");
        assert!(scopes.pop().is_empty());
        assert_eq!(scopes.depth(), 1);
    }

    #[test]
    fn deferrals_are_lifo() {
        let mut scopes = ScopeStack::new();
        scopes.push(true);
        scopes.defer("first".into());
        scopes.defer("second".into());
        let texts: Vec<_> = scopes.current().iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, ["second", "first"]);
        assert_eq!(scopes.pop().len(), 2);
    }

    #[test]
    fn unwind_stops_at_function_scope() {
        let mut scopes = ScopeStack::new();
        scopes.push(true);
        scopes.defer("outer fn".into());
        scopes.push(true);
        scopes.defer("inner fn".into());
        scopes.push(false);
        scopes.defer("loop".into());

        let texts: Vec<_> = scopes.unwind().iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, ["loop", "inner fn"]);
        assert_eq!(scopes.current().len(), 1);
    }

    #[test]
    fn reindents_every_line() {
        let text = "    if x then\n      f()\n    end";
        assert_eq!(reindent(text, 2, 3), "      if x then\n        f()\n      end");
        assert_eq!(reindent("  a", 1, 1), "  a");
    }
}
