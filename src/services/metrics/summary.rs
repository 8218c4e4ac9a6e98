use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use prometheus::core::{Atomic, AtomicF64, AtomicU64, Collector, Desc, Describer};
use prometheus::proto::{self, LabelPair, MetricFamily, MetricType};
use prometheus::Opts;

/// Running sum and count of observations
struct SummaryCore {
    sum: AtomicF64,
    count: AtomicU64,
}

impl SummaryCore {
    fn new() -> Self {
        Self {
            sum: AtomicF64::new(0.0),
            count: AtomicU64::new(0),
        }
    }
}

/// Summary without quantile objectives: exposes `_sum` and `_count` only
#[derive(Clone)]
pub struct Summary {
    desc: Arc<Desc>,
    label_pairs: Vec<LabelPair>,
    core: Arc<SummaryCore>,
}

impl Summary {
    pub fn with_opts(opts: Opts) -> Result<Self, prometheus::Error> {
        let desc = opts.describe()?;
        if !desc.variable_labels.is_empty() {
            return Err(prometheus::Error::InconsistentCardinality {
                expect: 0,
                got: desc.variable_labels.len(),
            });
        }

        let label_pairs = sorted_pairs(&desc, &[]);
        Ok(Self {
            desc: Arc::new(desc),
            label_pairs,
            core: Arc::new(SummaryCore::new()),
        })
    }

    pub fn observe(&self, value: f64) {
        self.core.sum.inc_by(value);
        self.core.count.inc_by(1);
    }

    pub fn get_sample_count(&self) -> u64 {
        self.core.count.get()
    }

    pub fn get_sample_sum(&self) -> f64 {
        self.core.sum.get()
    }

    fn metric(&self) -> proto::Metric {
        let mut summary = proto::Summary::default();
        summary.set_sample_count(self.core.count.get());
        summary.set_sample_sum(self.core.sum.get());

        let mut metric = proto::Metric::default();
        metric.set_label(self.label_pairs.clone().into());
        metric.set_summary(summary);
        metric
    }
}

impl Collector for Summary {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        vec![family(&self.desc, vec![self.metric()])]
    }
}

/// Summary partitioned by label values
#[derive(Clone)]
pub struct SummaryVec {
    desc: Arc<Desc>,
    children: Arc<RwLock<HashMap<Vec<String>, Summary>>>,
}

impl SummaryVec {
    pub fn new(opts: Opts, label_names: &[&str]) -> Result<Self, prometheus::Error> {
        let variable_labels = label_names.iter().map(|l| l.to_string()).collect();
        let desc = opts.variable_labels(variable_labels).describe()?;

        Ok(Self {
            desc: Arc::new(desc),
            children: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn get_metric_with_label_values(
        &self,
        values: &[&str],
    ) -> Result<Summary, prometheus::Error> {
        if values.len() != self.desc.variable_labels.len() {
            return Err(prometheus::Error::InconsistentCardinality {
                expect: self.desc.variable_labels.len(),
                got: values.len(),
            });
        }

        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        if let Some(child) = self
            .children
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return Ok(child.clone());
        }

        let mut children = self.children.write().unwrap_or_else(|e| e.into_inner());
        let child = children.entry(key).or_insert_with(|| Summary {
            desc: self.desc.clone(),
            label_pairs: sorted_pairs(&self.desc, values),
            core: Arc::new(SummaryCore::new()),
        });
        Ok(child.clone())
    }

    /// Panics when the number of values differs from the declared labels,
    /// like the vectors of the prometheus crate.
    pub fn with_label_values(&self, values: &[&str]) -> Summary {
        self.get_metric_with_label_values(values)
            .unwrap_or_else(|e| panic!("{}", e))
    }
}

impl Collector for SummaryVec {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let metrics = self
            .children
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(Summary::metric)
            .collect();
        vec![family(&self.desc, metrics)]
    }
}

fn family(desc: &Desc, metrics: Vec<proto::Metric>) -> MetricFamily {
    let mut mf = MetricFamily::default();
    mf.set_name(desc.fq_name.clone());
    mf.set_help(desc.help.clone());
    mf.set_field_type(MetricType::SUMMARY);
    mf.set_metric(metrics.into());
    mf
}

fn sorted_pairs(desc: &Desc, values: &[&str]) -> Vec<LabelPair> {
    let mut pairs = desc.const_label_pairs.clone();
    for (name, value) in desc.variable_labels.iter().zip(values) {
        let mut pair = LabelPair::default();
        pair.set_name(name.clone());
        pair.set_value(value.to_string());
        pairs.push(pair);
    }
    pairs.sort_by(|a, b| a.get_name().cmp(b.get_name()));
    pairs
}
