//! Which resource links a taxon details page should show.
//!
//! Built once per request from counts gathered for the taxon and handed to
//! the page renderer; nothing here is shared between requests.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceLink {
    PartnerLinks,
    IdentificationResources,
    CitizenScience,
    Education,
    BiomedicalTerms,
    NucleotideSequences,
}

impl ResourceLink {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceLink::PartnerLinks => "partner_links",
            ResourceLink::IdentificationResources => "identification_resources",
            ResourceLink::CitizenScience => "citizen_science",
            ResourceLink::Education => "education",
            ResourceLink::BiomedicalTerms => "biomedical_terms",
            ResourceLink::NucleotideSequences => "nucleotide_sequences",
        }
    }
}

/// Content counts for one taxon, as seen by the current user and language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonContentSummary {
    pub has_content_partner_links: bool,
    pub identification_resources: usize,
    pub citizen_science_contents: usize,
    /// Articles in the education chapter and its sub-chapters.
    pub education_contents: usize,
    pub has_biomedical_terms: bool,
    pub has_nucleotide_sequences: bool,
    pub has_literature_references: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceLinks {
    pub resource_links: Vec<ResourceLink>,
    pub show_literature_references_link: bool,
}

impl ResourceLinks {
    pub fn shows(&self, link: ResourceLink) -> bool {
        self.resource_links.contains(&link)
    }
}

pub fn collect_resource_links(summary: &TaxonContentSummary) -> ResourceLinks {
    let candidates = [
        (ResourceLink::PartnerLinks, summary.has_content_partner_links),
        (
            ResourceLink::IdentificationResources,
            summary.identification_resources > 0,
        ),
        (
            ResourceLink::CitizenScience,
            summary.citizen_science_contents > 0,
        ),
        (ResourceLink::Education, summary.education_contents > 0),
        (ResourceLink::BiomedicalTerms, summary.has_biomedical_terms),
        (
            ResourceLink::NucleotideSequences,
            summary.has_nucleotide_sequences,
        ),
    ];

    ResourceLinks {
        resource_links: candidates
            .into_iter()
            .filter(|(_, shown)| *shown)
            .map(|(link, _)| link)
            .collect(),
        show_literature_references_link: summary.has_literature_references,
    }
}
