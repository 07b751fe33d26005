use {
  sampler_view::{Addr, PeerDescriptor},
  std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt::Display,
  },
  tracing::debug,
};

/// Number of nodes per observed value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Histogram(BTreeMap<usize, usize>);

impl Histogram {
  pub fn record(&mut self, value: usize) {
    *self.0.entry(value).or_default() += 1;
  }

  pub fn count(&self, value: usize) -> usize {
    self.0.get(&value).copied().unwrap_or(0)
  }

  /// Number of recorded samples.
  pub fn total(&self) -> usize {
    self.0.values().sum()
  }

  pub fn min(&self) -> Option<usize> {
    self.0.keys().next().copied()
  }

  pub fn max(&self) -> Option<usize> {
    self.0.keys().next_back().copied()
  }

  pub fn mean(&self) -> f64 {
    let total = self.total();
    if total == 0 {
      return 0.0;
    }
    let sum: usize = self.0.iter().map(|(v, c)| v * c).sum();
    sum as f64 / total as f64
  }

  /// Population standard deviation.
  pub fn std_dev(&self) -> f64 {
    let total = self.total();
    if total == 0 {
      return 0.0;
    }
    let mean = self.mean();
    let variance: f64 = self
      .0
      .iter()
      .map(|(v, c)| (*v as f64 - mean).powi(2) * *c as f64)
      .sum::<f64>()
      / total as f64;
    variance.sqrt()
  }

  pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
    self.0.iter().map(|(v, c)| (*v, *c))
  }
}

impl FromIterator<usize> for Histogram {
  fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
    let mut histogram = Histogram::default();
    for value in iter {
      histogram.record(value);
    }
    histogram
  }
}

impl Display for Histogram {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{{")?;
    for (i, (value, count)) in self.iter().enumerate() {
      if i > 0 {
        write!(f, ", ")?;
      }
      write!(f, "{value}:{count}")?;
    }
    write!(f, "}}")
  }
}

/// Directed graph formed by the views of all live nodes.
///
/// There is an edge `a -> b` when `b` is in the view of `a`. Edges may
/// point at nodes that are no longer alive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
  edges: BTreeMap<Addr, Vec<Addr>>,
}

impl Overlay {
  pub fn new<'a>(
    views: impl IntoIterator<Item = (&'a Addr, &'a [PeerDescriptor])>,
  ) -> Self {
    Self {
      edges: views
        .into_iter()
        .map(|(addr, peers)| {
          (addr.clone(), peers.iter().map(|d| d.addr.clone()).collect())
        })
        .collect(),
    }
  }

  /// Number of live nodes.
  pub fn len(&self) -> usize {
    self.edges.len()
  }

  pub fn is_empty(&self) -> bool {
    self.edges.is_empty()
  }

  pub fn neighbours(&self, addr: &Addr) -> Option<&[Addr]> {
    self.edges.get(addr).map(Vec::as_slice)
  }

  /// View sizes of all live nodes.
  pub fn out_degrees(&self) -> Histogram {
    self.edges.values().map(Vec::len).collect()
  }

  /// How many live views reference each live node, nodes nobody
  /// references are counted at zero.
  pub fn in_degrees(&self) -> Histogram {
    let mut references: HashMap<&Addr, usize> = HashMap::new();
    for peers in self.edges.values() {
      for peer in peers {
        *references.entry(peer).or_default() += 1;
      }
    }

    self
      .edges
      .keys()
      .map(|addr| references.get(addr).copied().unwrap_or(0))
      .collect()
  }

  /// Nodes reachable from `from` by following view edges, `from`
  /// included. References to dead nodes are skipped.
  pub fn reachable(&self, from: &Addr) -> HashSet<&Addr> {
    let mut seen = HashSet::new();
    let mut stack: Vec<&Addr> = self
      .edges
      .get_key_value(from)
      .map(|(addr, _)| addr)
      .into_iter()
      .collect();

    while let Some(addr) = stack.pop() {
      if !seen.insert(addr) {
        continue;
      }
      if let Some(peers) = self.edges.get(addr) {
        stack.extend(
          peers
            .iter()
            .filter(|p| self.edges.contains_key(*p) && !seen.contains(p)),
        );
      }
    }
    seen
  }

  /// True when some live node cannot be reached from `from`.
  pub fn is_partitioned(&self, from: &Addr) -> bool {
    let reached = self.reachable(from).len();
    if reached < self.edges.len() {
      debug!(
        "partition found: reached {reached}, missed {}",
        self.edges.len() - reached
      );
      true
    } else {
      false
    }
  }

  /// Degree distributions and a partition check rooted at the first
  /// live node.
  pub fn summary(&self) -> Summary {
    Summary {
      nodes: self.len(),
      out_degree: self.out_degrees(),
      in_degree: self.in_degrees(),
      partitioned: self
        .edges
        .keys()
        .next()
        .map(|root| self.is_partitioned(root))
        .unwrap_or(false),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
  pub nodes: usize,
  pub out_degree: Histogram,
  pub in_degree: Histogram,
  pub partitioned: bool,
}

impl Display for Summary {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    writeln!(f, "live nodes: {}", self.nodes)?;
    writeln!(
      f,
      "out-degree (mean {:.2}, std {:.2}): {}",
      self.out_degree.mean(),
      self.out_degree.std_dev(),
      self.out_degree
    )?;
    writeln!(
      f,
      "in-degree (mean {:.2}, std {:.2}): {}",
      self.in_degree.mean(),
      self.in_degree.std_dev(),
      self.in_degree
    )?;
    write!(f, "partitioned: {}", self.partitioned)
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{Histogram, Overlay},
    sampler_view::{Addr, PeerDescriptor},
  };

  /// Each entry is a node followed by its whitespace separated view.
  fn overlay(edges: &[(&str, &str)]) -> Overlay {
    let views: Vec<(Addr, Vec<PeerDescriptor>)> = edges
      .iter()
      .map(|(addr, peers)| {
        (
          Addr::from(*addr),
          peers
            .split_whitespace()
            .map(|p| PeerDescriptor::new(p, 0, 0, 0))
            .collect(),
        )
      })
      .collect();
    Overlay::new(views.iter().map(|(a, p)| (a, p.as_slice())))
  }

  #[test]
  fn histogram_stats() {
    let h: Histogram = [2, 4, 4, 4, 5, 5, 7, 9].into_iter().collect();
    assert_eq!(h.total(), 8);
    assert_eq!(h.count(4), 3);
    assert_eq!(h.count(3), 0);
    assert_eq!(h.min(), Some(2));
    assert_eq!(h.max(), Some(9));
    assert!((h.mean() - 5.0).abs() < 1e-9);
    assert!((h.std_dev() - 2.0).abs() < 1e-9);
    assert_eq!(h.to_string(), "{2:1, 4:3, 5:2, 7:1, 9:1}");

    let empty = Histogram::default();
    assert_eq!(empty.mean(), 0.0);
    assert_eq!(empty.to_string(), "{}");
  }

  #[test]
  fn degrees() {
    let o = overlay(&[
      ("n0", "n1 n2"),
      ("n1", "n0 dead"),
      ("n2", "n1"),
      ("n3", "n0"),
    ]);
    assert_eq!(o.out_degrees().to_string(), "{1:2, 2:2}");

    // n0: 2, n1: 2, n2: 1, n3: 0
    assert_eq!(o.in_degrees().to_string(), "{0:1, 1:1, 2:2}");
  }

  #[test]
  fn partitions() {
    let connected =
      overlay(&[("n0", "n1"), ("n1", "n2 dead"), ("n2", "n0")]);
    assert!(!connected.is_partitioned(&"n0".into()));
    assert!(!connected.summary().partitioned);

    // nobody points at n3
    let split = overlay(&[("n0", "n1"), ("n1", "n0"), ("n3", "n0")]);
    assert!(split.is_partitioned(&"n0".into()));
    assert!(!split.is_partitioned(&"n3".into()));
    assert_eq!(split.reachable(&"n0".into()).len(), 2);
    assert!(split.summary().partitioned);

    // an unknown root reaches nothing
    assert!(split.is_partitioned(&"zz".into()));
    assert!(!Overlay::default().summary().partitioned);
  }
}
