use std::fmt;

/// Coverage criteria understood by the executors and objectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    /// A method has been called.
    Method,
    /// A call to a method has returned without an exception.
    MethodNoException,
    /// A harness-reported branch has been taken.
    Branch,
}

impl Criterion {
    pub const ALL: [Criterion; 3] = [
        Criterion::Method,
        Criterion::MethodNoException,
        Criterion::Branch,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Criterion::Method => "method",
            Criterion::MethodNoException => "method-no-exception",
            Criterion::Branch => "branch",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tag() == tag)
    }

    /// The id under which executors report coverage of `name` for this criterion.
    pub fn goal_id(&self, name: &str) -> String {
        format!("{}:{}", self.tag(), name)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Goal {
    pub criterion: Criterion,
    pub name: String,
}

impl Goal {
    pub fn new(criterion: Criterion, name: impl Into<String>) -> Self {
        Self {
            criterion,
            name: name.into(),
        }
    }

    pub fn id(&self) -> String {
        self.criterion.goal_id(&self.name)
    }
}

/// Produces the coverage goals of one criterion.
pub trait GoalProvider: Send {
    fn criterion(&self) -> Criterion;
    fn goals(&self) -> Vec<Goal>;
}

/// One goal per method of the call catalog.
pub struct MethodGoals {
    methods: Vec<String>,
    require_no_exception: bool,
}

impl MethodGoals {
    pub fn called(methods: Vec<String>) -> Self {
        Self {
            methods,
            require_no_exception: false,
        }
    }

    pub fn returned_normally(methods: Vec<String>) -> Self {
        Self {
            methods,
            require_no_exception: true,
        }
    }
}

impl GoalProvider for MethodGoals {
    fn criterion(&self) -> Criterion {
        if self.require_no_exception {
            Criterion::MethodNoException
        } else {
            Criterion::Method
        }
    }

    fn goals(&self) -> Vec<Goal> {
        let criterion = self.criterion();
        self.methods
            .iter()
            .map(|m| Goal::new(criterion, m.clone()))
            .collect()
    }
}

/// One goal per branch id the harness is known to report.
pub struct BranchGoals {
    branches: Vec<String>,
}

impl BranchGoals {
    pub fn new(branches: Vec<String>) -> Self {
        Self { branches }
    }
}

impl GoalProvider for BranchGoals {
    fn criterion(&self) -> Criterion {
        Criterion::Branch
    }

    fn goals(&self) -> Vec<Goal> {
        self.branches
            .iter()
            .map(|b| Goal::new(Criterion::Branch, b.clone()))
            .collect()
    }
}

/// The goals of every provider, enumerated once before a search starts.
#[derive(Debug, Clone, Default)]
pub struct GoalSet {
    groups: Vec<(Criterion, Vec<Goal>)>,
}

impl GoalSet {
    /// Visits providers in order, keeping each provider's goals in the order produced.
    pub fn enumerate(providers: &[Box<dyn GoalProvider>]) -> Self {
        let groups = providers
            .iter()
            .map(|p| {
                let goals = p.goals();
                log::info!("  - {} {}", p.criterion(), goals.len());
                (p.criterion(), goals)
            })
            .collect();
        Self { groups }
    }

    pub fn groups(&self) -> &[(Criterion, Vec<Goal>)] {
        &self.groups
    }

    pub fn iter(&self) -> impl Iterator<Item = &Goal> {
        self.groups.iter().flat_map(|(_, goals)| goals.iter())
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, goals)| goals.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criterion_tags_round_trip() {
        for criterion in Criterion::ALL {
            assert_eq!(Criterion::from_tag(criterion.tag()), Some(criterion));
        }
        assert_eq!(Criterion::from_tag("mutation"), None);
        assert_eq!(Criterion::Branch.goal_id("pop-empty"), "branch:pop-empty");
    }

    #[test]
    fn enumerate_concatenates_in_provider_order() {
        let methods = vec!["push".to_string(), "pop".to_string()];
        let providers: Vec<Box<dyn GoalProvider>> = vec![
            Box::new(MethodGoals::called(methods.clone())),
            Box::new(BranchGoals::new(vec!["pop-empty".to_string()])),
            Box::new(MethodGoals::returned_normally(methods)),
        ];

        let set = GoalSet::enumerate(&providers);
        assert_eq!(set.len(), 5);
        let ids: Vec<String> = set.iter().map(Goal::id).collect();
        assert_eq!(
            ids,
            vec![
                "method:push",
                "method:pop",
                "branch:pop-empty",
                "method-no-exception:push",
                "method-no-exception:pop",
            ]
        );
        assert_eq!(set.groups()[1].0, Criterion::Branch);
    }

    #[test]
    fn no_providers_means_no_goals() {
        let set = GoalSet::enumerate(&[]);
        assert!(set.is_empty());
    }
}
