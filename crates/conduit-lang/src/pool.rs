use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tree_sitter::Parser;

use crate::Language;

struct LanguagePool {
    idle: Mutex<Vec<Parser>>,
    permits: Semaphore,
}

/// A bounded pool of tree-sitter parsers keyed by language.
///
/// Tree-sitter parsers are not thread-safe (§5, "parser ownership"); a task
/// checks one out for the duration of a single file's extraction and it is
/// returned to the pool when the guard drops.
pub struct ParserPool {
    pools: HashMap<Language, Arc<LanguagePool>>,
}

impl ParserPool {
    /// `capacity` bounds the number of parsers held per language at once.
    pub fn new(capacity: usize) -> Self {
        let mut pools = HashMap::new();
        for lang in [
            Language::Python,
            Language::Go,
            Language::TypeScript,
            Language::CSharp,
        ] {
            pools.insert(
                lang,
                Arc::new(LanguagePool {
                    idle: Mutex::new(Vec::with_capacity(capacity)),
                    permits: Semaphore::new(capacity),
                }),
            );
        }
        ParserPool { pools }
    }

    /// Checks out a parser for `language`, blocking until a permit is free.
    pub async fn checkout(&self, language: Language) -> ParserGuard {
        let pool = self
            .pools
            .get(&language)
            .expect("ParserPool constructed with all languages")
            .clone();

        let permit = pool
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore never closed");

        let parser = {
            let mut idle = pool.idle.lock().await;
            idle.pop()
        };
        let parser = parser.unwrap_or_else(|| {
            let mut parser = Parser::new();
            parser
                .set_language(&language.grammar())
                .expect("grammar is bundled and compatible with tree-sitter version");
            parser
        });

        ParserGuard {
            parser: Some(parser),
            pool,
            _permit: permit,
        }
    }
}

/// Scoped access to a checked-out parser. Returns the parser to the pool on
/// drop so the next caller reuses it instead of re-allocating.
pub struct ParserGuard {
    parser: Option<Parser>,
    pool: Arc<LanguagePool>,
    _permit: tokio::sync::OwnedSemaphorePermit,
}

impl ParserGuard {
    pub fn parser_mut(&mut self) -> &mut Parser {
        self.parser.as_mut().expect("parser present until drop")
    }
}

impl Drop for ParserGuard {
    fn drop(&mut self) {
        if let Some(parser) = self.parser.take() {
            let pool = self.pool.clone();
            if let Ok(mut idle) = pool.idle.try_lock() {
                idle.push(parser);
            }
            // If the lock is contended, drop the parser rather than block in
            // a Drop impl; the pool simply allocates a fresh one next time.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn checkout_and_return_round_trips() {
        let pool = ParserPool::new(1);
        {
            let mut guard = pool.checkout(Language::Python).await;
            let tree = guard.parser_mut().parse("x = 1", None);
            assert!(tree.is_some());
        }
        // Second checkout should succeed promptly since the first returned.
        let mut guard = pool.checkout(Language::Python).await;
        assert!(guard.parser_mut().parse("y = 2", None).is_some());
    }
}
