use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Memoização com prazo de validade e número máximo de entradas.
pub struct CacheTtl<K, V> {
    ttl: Duration,
    capacidade: usize,
    entradas: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K: Eq + Hash + Clone, V: Clone> CacheTtl<K, V> {
    pub fn new(ttl: Duration, capacidade: usize) -> Self {
        Self {
            ttl,
            capacidade: capacidade.max(1),
            entradas: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, chave: &K) -> Option<V> {
        let entradas = self.entradas.lock().ok()?;
        entradas
            .get(chave)
            .filter(|(criado, _)| criado.elapsed() < self.ttl)
            .map(|(_, v)| v.clone())
    }

    pub fn insert(&self, chave: K, valor: V) {
        let Ok(mut entradas) = self.entradas.lock() else {
            return;
        };
        if entradas.len() >= self.capacidade && !entradas.contains_key(&chave) {
            let ttl = self.ttl;
            entradas.retain(|_, (criado, _)| criado.elapsed() < ttl);
            if entradas.len() >= self.capacidade {
                let mais_antiga = entradas
                    .iter()
                    .min_by_key(|(_, (criado, _))| *criado)
                    .map(|(k, _)| k.clone());
                if let Some(k) = mais_antiga {
                    entradas.remove(&k);
                }
            }
        }
        entradas.insert(chave, (Instant::now(), valor));
    }

    /// Devolve o valor em cache ou calcula, guardando só resultados de sucesso.
    pub fn obter_ou<E>(&self, chave: K, calcular: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        if let Some(v) = self.get(&chave) {
            return Ok(v);
        }
        let valor = calcular()?;
        self.insert(chave, valor.clone());
        Ok(valor)
    }

    pub fn invalidar(&self) {
        if let Ok(mut entradas) = self.entradas.lock() {
            entradas.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_value_within_ttl() {
        let cache = CacheTtl::new(Duration::from_secs(60), 10);
        let mut calculos = 0;
        for _ in 0..3 {
            let v: Result<u32, ()> = cache.obter_ou("ufs", || {
                calculos += 1;
                Ok(27)
            });
            assert_eq!(v, Ok(27));
        }
        assert_eq!(calculos, 1);
    }

    #[test]
    fn expired_entries_are_recomputed() {
        let cache = CacheTtl::new(Duration::ZERO, 10);
        cache.insert(1, "a");
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache: CacheTtl<u8, u8> = CacheTtl::new(Duration::from_secs(60), 10);
        assert_eq!(cache.obter_ou(1, || Err("falhou")), Err("falhou"));
        assert_eq!(cache.obter_ou(1, || Ok::<_, &str>(5)), Ok(5));
    }

    #[test]
    fn evicts_oldest_when_full() {
        let cache = CacheTtl::new(Duration::from_secs(60), 2);
        cache.insert("a", 1);
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("b", 2);
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("c", 3);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn invalidation_clears_entries() {
        let cache = CacheTtl::new(Duration::from_secs(60), 2);
        cache.insert("a", 1);
        cache.invalidar();
        assert_eq!(cache.get(&"a"), None);
    }
}
