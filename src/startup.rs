//! Startup analysis crew: discovery → competitive analysis → product pitch →
//! feature analysis, run on the same [`StagePipeline`](crate::pipeline::StagePipeline)
//! as the built-in scenarios.
//!
//! The research "tools" here are prompt helpers. They return fixed research
//! briefs that are appended to the stage prompt; nothing performs a live
//! search, and the report says so.

use std::collections::BTreeMap;

use chrono::Datelike;

use crate::pipeline::{PipelineContext, Stage};

/// Placeholder used until the discovery stage names a concrete company.
pub const UNDISCOVERED_STARTUP: &str = "[To be discovered]";

pub const STARTUP_STAGE_NAMES: [&str; 4] = [
    "startup_discovery",
    "competitive_analysis",
    "product_pitch",
    "feature_analysis",
];

pub const STATIC_BRIEF_NOTICE: &str = "Research briefs are static instructional text built into \
     the prompts; no live web search or database lookup was performed. Verify startup, funding \
     and market details independently before acting on them.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupParams {
    pub industry: String,
    pub location: String,
    pub startup_stage: String,
    pub target_audience: String,
    pub analysis_focus: String,
    pub category: String,
    pub timeframe: String,
}

impl Default for StartupParams {
    fn default() -> Self {
        Self {
            industry: "AI/ML".to_string(),
            location: "San Francisco Bay Area".to_string(),
            startup_stage: "Seed to Series A".to_string(),
            target_audience: "B2B SaaS".to_string(),
            analysis_focus: "comprehensive".to_string(),
            category: "productivity tools".to_string(),
            timeframe: chrono::Local::now().year().to_string(),
        }
    }
}

impl StartupParams {
    /// Parameter rows for the report header, in display order.
    pub fn display_rows(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("Industry", self.industry.as_str()),
            ("Location", self.location.as_str()),
            ("Startup Stage", self.startup_stage.as_str()),
            ("Target Audience", self.target_audience.as_str()),
            ("Analysis Focus", self.analysis_focus.as_str()),
            ("Product Category", self.category.as_str()),
            ("Trend Timeframe", self.timeframe.as_str()),
        ]
    }

    pub fn as_inputs(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("industry".to_string(), self.industry.clone()),
            ("location".to_string(), self.location.clone()),
            ("startup_stage".to_string(), self.startup_stage.clone()),
            ("target_audience".to_string(), self.target_audience.clone()),
            ("analysis_focus".to_string(), self.analysis_focus.clone()),
            ("category".to_string(), self.category.clone()),
            ("timeframe".to_string(), self.timeframe.clone()),
        ])
    }

    /// Report file prefix, e.g. `startup_analysis_ai_ml`.
    pub fn report_slug(&self) -> String {
        let industry = self
            .industry
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
            .collect::<String>();
        let industry = industry
            .split('_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        if industry.is_empty() {
            "startup_analysis".to_string()
        } else {
            format!("startup_analysis_{industry}")
        }
    }
}

pub fn search_emerging_startups(industry: &str, location: &str) -> String {
    format!(
        "Research task: Find emerging startups in {industry} within {location}.\n\n\
         Please research and provide:\n\
         1. Recently funded startups (check Crunchbase, PitchBook, AngelList)\n\
         2. Startup founding teams and their backgrounds\n\
         3. Funding rounds and investor information\n\
         4. Problem they're solving and target market\n\
         5. Current traction and growth metrics\n\
         6. Notable achievements and press coverage\n\n\
         Focus on startups founded within the last 3 years with recent activity."
    )
}

pub fn analyze_competitors(startup_name: &str, industry: &str) -> String {
    format!(
        "Research task: Analyze competitors of {startup_name} in the {industry} space.\n\n\
         Please research and provide:\n\
         1. Direct competitors with similar offerings (check G2, Capterra, ProductHunt)\n\
         2. Market share and positioning of each competitor\n\
         3. Competitive advantages and unique selling propositions\n\
         4. Pricing strategies and business models\n\
         5. Customer reviews and satisfaction ratings\n\
         6. Recent product launches and strategic moves\n\
         7. Strengths and weaknesses analysis\n\n\
         Include both established players and emerging competitors.\n\
         Focus on actionable competitive insights."
    )
}

pub fn analyze_product_features(product_name: &str, category: &str) -> String {
    format!(
        "Research task: Analyze features of {product_name} in the {category} space.\n\n\
         Please research and provide:\n\
         1. Core features and functionality overview\n\
         2. User reviews and feature-specific feedback (check ProductHunt, G2, Reddit)\n\
         3. Feature comparison with competing products\n\
         4. Most requested features from users\n\
         5. Technical specifications and integrations\n\
         6. Usability and user experience insights\n\
         7. Feature gaps and improvement opportunities\n\n\
         Include both positive feedback and pain points.\n\
         Focus on actionable insights for product development."
    )
}

pub fn research_market_trends(industry: &str, timeframe: &str) -> String {
    format!(
        "Research task: Analyze market trends in the {industry} sector for {timeframe}.\n\n\
         Please research and provide:\n\
         1. Current market size and growth projections\n\
         2. Key trends driving the industry (check Gartner, McKinsey, industry reports)\n\
         3. Emerging technologies and innovations\n\
         4. Consumer behavior shifts and preferences\n\
         5. Regulatory changes and their impact\n\
         6. Investment trends and VC interest\n\
         7. Market opportunities and white spaces\n\n\
         Provide data-driven insights with credible sources.\n\
         Focus on actionable trends for startup opportunities."
    )
}

struct CrewMember {
    role: &'static str,
    goal: String,
    backstory: &'static str,
}

impl CrewMember {
    fn system_prompt(&self) -> String {
        format!(
            "You are the {}.\nGoal: {}\n\nBackstory: {}",
            self.role, self.goal, self.backstory
        )
    }
}

struct CrewTask {
    description: String,
    expected_output: String,
    briefs: Vec<String>,
}

impl CrewTask {
    fn user_message(&self, ctx: &PipelineContext) -> String {
        let mut sections = vec![
            format!("Task:\n{}", self.description),
            format!("Expected output:\n{}", self.expected_output),
        ];
        for brief in &self.briefs {
            sections.push(format!("Research brief:\n{brief}"));
        }
        if !ctx.is_empty() {
            let prior = ctx
                .outputs()
                .map(|(stage, text)| format!("## {stage}\n{text}"))
                .collect::<Vec<_>>()
                .join("\n\n");
            sections.push(format!("Context from previous tasks:\n\n{prior}"));
        }
        sections.join("\n\n")
    }
}

fn crew_stage(name: &'static str, member: CrewMember, task: CrewTask) -> Stage {
    Stage::new(name, member.system_prompt(), move |ctx| task.user_message(ctx))
        .with_role(member.role)
}

pub fn startup_stages(params: &StartupParams) -> Vec<Stage> {
    let StartupParams {
        industry,
        location,
        startup_stage,
        target_audience,
        analysis_focus,
        category,
        timeframe,
    } = params;
    let startup = UNDISCOVERED_STARTUP;
    let [discovery, competition, pitch, features] = STARTUP_STAGE_NAMES;

    let scout = CrewMember {
        role: "Startup Discovery Specialist",
        goal: format!(
            "Discover and analyze emerging startups in the {industry} sector within {location}, \
             identifying promising companies with innovative solutions."
        ),
        backstory: "You are a seasoned startup scout with a background in venture capital and \
             deep connections in the startup ecosystem. You have evaluated thousands of \
             startups and have a keen eye for innovation, strong founding teams, and scalable \
             business models. You cross-check information from multiple sources.",
    };
    let analyst = CrewMember {
        role: "Competitive Analysis Expert",
        goal: format!(
            "Conduct comprehensive competitive analysis in the {industry} market, identifying \
             key players, market dynamics, and strategic opportunities."
        ),
        backstory: "You are a strategic market analyst with over 15 years of experience in \
             competitive intelligence and market research. You combine data analytics with \
             strategic thinking and dissect competitor strategies, market positioning, and \
             customer sentiment.",
    };
    let strategist = CrewMember {
        role: "Product Pitch Specialist",
        goal: format!(
            "Create compelling product pitches and value propositions for startups in the \
             {industry} sector, crafting narratives that resonate with investors and customers."
        ),
        backstory: "You are a product strategist and storyteller who has helped launch over \
             100 products. You translate complex technical features into clear value \
             propositions and ground every pitch in market research and user insight.",
    };
    let feature_analyst = CrewMember {
        role: "Feature Analysis Expert",
        goal: format!(
            "Analyze product features and user feedback for {category} products, identifying \
             strengths, weaknesses, and opportunities for innovation."
        ),
        backstory: "You are a product analyst with deep expertise in feature optimization and \
             user experience design. You combine quantitative analysis with qualitative user \
             research and base recommendations on real user feedback.",
    };

    vec![
        crew_stage(
            discovery,
            scout,
            CrewTask {
                description: format!(
                    "Research and compile a list of emerging startups in the {industry} industry \
                     within {location} at {startup_stage} stage. Find at least 3-5 promising \
                     startups, including details about their founding team, problem they solve, \
                     funding history, traction metrics, and competitive advantages. Recommend \
                     which startups show the most promise based on market opportunity and \
                     execution capability. Analysis focus: {analysis_focus}."
                ),
                expected_output: format!(
                    "A detailed report with 3-5 emerging startups in {industry} including \
                     founding teams, funding details, traction metrics, and strategic \
                     recommendations."
                ),
                briefs: vec![search_emerging_startups(industry, location)],
            },
        ),
        crew_stage(
            competition,
            analyst,
            CrewTask {
                description: format!(
                    "Based on the discovered startup {startup}, conduct a comprehensive \
                     competitive analysis in the {industry} market. For each competitor, provide \
                     market positioning, unique value propositions, pricing strategies, customer \
                     satisfaction, and recent strategic moves. Include direct competitors and \
                     potential threats from adjacent markets, and identify opportunities for \
                     differentiation."
                ),
                expected_output: format!(
                    "A competitive analysis for {startup} in {industry} with competitor \
                     profiles, a market positioning matrix, SWOT analysis, and strategic \
                     recommendations."
                ),
                briefs: vec![
                    analyze_competitors(startup, industry),
                    research_market_trends(industry, timeframe),
                ],
            },
        ),
        crew_stage(
            pitch,
            strategist,
            CrewTask {
                description: format!(
                    "Create a compelling product pitch for {startup} in the {industry} sector \
                     targeting {target_audience}. Based on the competitive analysis, craft a \
                     unique value proposition, key messaging that addresses customer pain \
                     points, and a pitch deck outline with market opportunity sizing, \
                     go-to-market strategy, and investment highlights."
                ),
                expected_output: format!(
                    "A product pitch for {startup} including unique value proposition, key \
                     messaging framework, pitch deck outline with 10-12 slides, go-to-market \
                     strategy, and investment highlights."
                ),
                briefs: vec![analyze_product_features(startup, category)],
            },
        ),
        crew_stage(
            features,
            feature_analyst,
            CrewTask {
                description: format!(
                    "Based on the product pitch for {startup}, conduct a detailed feature \
                     analysis in the {category} space. Analyze core features, user satisfaction, \
                     feature requests, and pain points. Compare features with competing products, \
                     identify gaps, and recommend feature prioritization and roadmap items."
                ),
                expected_output: format!(
                    "A feature analysis for {startup} including a feature comparison matrix, \
                     user satisfaction summary, top feature requests, competitive feature gaps, \
                     and prioritized roadmap recommendations."
                ),
                briefs: vec![
                    analyze_product_features(startup, category),
                    research_market_trends(industry, timeframe),
                ],
            },
        ),
    ]
}
