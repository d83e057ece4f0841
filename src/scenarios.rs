use anyhow::Result;

use crate::pipeline::{PipelineContext, Stage};

/// Stage names shared by every built-in scenario, in execution order.
pub const STAGE_NAMES: [&str; 4] = ["research", "analysis", "blueprint", "review"];

/// Banner shown above each stage's progress output.
pub fn phase_title(stage: &str) -> &'static str {
    match stage {
        "research" => "RESEARCH",
        "analysis" => "ANALYSIS",
        "blueprint" => "BLUEPRINT/DESIGN",
        "review" => "REVIEW & RECOMMENDATIONS",
        _ => "STAGE",
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScenarioSpec {
    pub id: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
    pub context: &'static str,
    /// Role label per stage, aligned with [`STAGE_NAMES`].
    pub roles: [&'static str; 4],
    /// System instruction per stage, aligned with [`STAGE_NAMES`].
    pub instructions: [&'static str; 4],
    /// User message for the first stage.
    pub kickoff: &'static str,
}

const SCENARIOS: [ScenarioSpec; 4] = [
    ScenarioSpec {
        id: "conference",
        title: "3-Day AI/ML Conference Planning",
        summary: "Plan a 3-day AI/ML conference",
        context: "planning a 3-day AI/ML conference for 500 attendees",
        roles: [
            "Conference Research Specialist",
            "Attendee & Speaker Analyst",
            "Agenda Designer",
            "Conference Director",
        ],
        instructions: [
            "You are a conference research specialist. Research successful AI/ML conferences \
             and provide insights on: keynote speakers, workshop formats, networking events, and \
             sponsorship models.\nAnalyze 3 similar conferences. Be concise - 150 words.",
            "You are an attendee and speaker analyst. Based on the research, identify:\n\
             target attendee profiles, speaker selection criteria, and engagement opportunities.\n\
             Provide 3 key insights. Be concise - 150 words.",
            "You are an agenda designer. Create a detailed 3-day conference agenda including:\n\
             Day-by-day schedule with timings, keynote topics, workshop themes, and networking \
             events.\nBe specific and practical - 150 words.",
            "You are a conference director. Review the agenda and provide:\n\
             Risk mitigation strategies, budget considerations, and success metrics.\n\
             Give 3 strategic recommendations - 150 words.",
        ],
        kickoff: "Research successful AI/ML conferences and identify best practices.",
    },
    ScenarioSpec {
        id: "marketing",
        title: "Product Marketing Strategy",
        summary: "Design a B2B SaaS marketing strategy",
        context: "creating a marketing strategy for a new B2B SaaS product",
        roles: [
            "Market Research Analyst",
            "Customer Insights Specialist",
            "Marketing Strategist",
            "CMO Reviewer",
        ],
        instructions: [
            "You are a market research analyst. Research the B2B SaaS market and provide \
             insights on: target personas, competitor strategies, content marketing trends, and \
             channel effectiveness.\nFocus on data-driven insights. Be concise - 150 words.",
            "You are a customer insights specialist. Based on the research, identify:\n\
             customer pain points, buying journey stages, and value proposition opportunities.\n\
             Provide 3 actionable insights. Be concise - 150 words.",
            "You are a marketing strategist. Design a comprehensive strategy including:\n\
             Campaign objectives, key messages, channel mix, content calendar outline, and \
             success metrics.\nBe specific and actionable - 150 words.",
            "You are a CMO reviewer. Review the strategy and provide:\n\
             Budget allocation advice, risk factors, and optimization opportunities.\n\
             Give 3 strategic improvements - 150 words.",
        ],
        kickoff: "Research the B2B SaaS market and identify effective marketing strategies.",
    },
    ScenarioSpec {
        id: "research_paper",
        title: "Research Paper Outline",
        summary: "Create an AI ethics research paper outline",
        context: "outlining a research paper on AI ethics in healthcare",
        roles: [
            "Literature Review Specialist",
            "Research Gap Analyst",
            "Paper Structure Designer",
            "Academic Editor",
        ],
        instructions: [
            "You are a literature review specialist. Research existing papers on AI ethics in \
             healthcare and provide: key themes, major contributors, methodologies used, and \
             recent developments.\nIdentify 3-4 seminal papers. Be concise - 150 words.",
            "You are a research gap analyst. Based on the literature review, identify:\n\
             unexplored areas, methodological improvements, and potential contributions.\n\
             Highlight 3 research gaps. Be concise - 150 words.",
            "You are a paper structure designer. Create a detailed outline including:\n\
             Section titles, key arguments per section, methodology approach, and expected \
             contributions.\nFollow academic standards - 150 words.",
            "You are an academic editor. Review the outline and provide:\n\
             Strengths, potential weaknesses, and publication strategy recommendations.\n\
             Give 3 improvement suggestions - 150 words.",
        ],
        kickoff: "Research existing literature on AI ethics in healthcare.",
    },
    ScenarioSpec {
        id: "software",
        title: "Software Architecture Planning",
        summary: "Plan an e-commerce platform architecture",
        context: "designing architecture for a scalable e-commerce platform",
        roles: [
            "Tech Stack Researcher",
            "Requirements Analyst",
            "System Architect",
            "CTO Reviewer",
        ],
        instructions: [
            "You are a tech stack researcher. Research modern e-commerce architectures and \
             provide insights on: microservices patterns, database choices, API designs, and \
             scalability solutions.\nCompare 3 architecture approaches. Be concise - 150 words.",
            "You are a requirements analyst. Based on the research, identify:\n\
             critical system requirements, performance needs, and integration challenges.\n\
             List 3 key requirements. Be concise - 150 words.",
            "You are a system architect. Design the architecture including:\n\
             System components, data flow, API structure, deployment strategy, and scalability \
             approach.\nInclude specific technologies - 150 words.",
            "You are a CTO reviewer. Review the architecture and provide:\n\
             Security considerations, cost optimization, and deployment recommendations.\n\
             Give 3 technical improvements - 150 words.",
        ],
        kickoff: "Research modern e-commerce platform architectures and technologies.",
    },
];

pub fn scenario_catalog() -> &'static [ScenarioSpec] {
    &SCENARIOS
}

pub fn scenario_ids() -> Vec<&'static str> {
    SCENARIOS.iter().map(|scenario| scenario.id).collect()
}

pub fn find_scenario(id: &str) -> Result<&'static ScenarioSpec> {
    let wanted = id.trim();
    SCENARIOS
        .iter()
        .find(|scenario| scenario.id == wanted)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "unknown scenario '{}'. Available scenarios: {}",
                wanted,
                scenario_ids().join(", ")
            )
        })
}

/// User message that hands the previous stage's output to the next one.
fn handoff_message(ctx: &PipelineContext, from: &str, label: &str, ask: &str) -> String {
    let previous = ctx.output(from).unwrap_or_default();
    format!("{label}:\n{previous}\n\n{ask}")
}

impl ScenarioSpec {
    pub fn role_for(&self, stage: &str) -> Option<&'static str> {
        STAGE_NAMES
            .iter()
            .position(|name| *name == stage)
            .map(|idx| self.roles[idx])
    }

    pub fn stages(&self) -> Vec<Stage> {
        let [research, analysis, blueprint, review] = STAGE_NAMES;
        let kickoff = self.kickoff;
        vec![
            Stage::new(research, self.instructions[0], move |_ctx| kickoff.to_string())
                .with_role(self.roles[0]),
            Stage::new(analysis, self.instructions[1], move |ctx| {
                handoff_message(ctx, research, "Research findings", "Provide your analysis.")
            })
            .with_role(self.roles[1]),
            Stage::new(blueprint, self.instructions[2], move |ctx| {
                handoff_message(ctx, analysis, "Analysis", "Create your design/blueprint.")
            })
            .with_role(self.roles[2]),
            Stage::new(review, self.instructions[3], move |ctx| {
                handoff_message(ctx, blueprint, "Blueprint", "Provide your review.")
            })
            .with_role(self.roles[3]),
        ]
    }
}
