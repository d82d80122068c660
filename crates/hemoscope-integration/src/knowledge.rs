//! 固定提示词与临床知识库

/// 图像分类提示词，与微调时保持一致
pub const CLASSIFICATION_PROMPT: &str =
    "Analyze this blood cell microscopy image and classify it.\n\
Is the cell NORMAL or LEUKEMIA (blast)?\n\
Answer with exactly one of: Normal, Leukemia.\n";

/// 急性淋巴细胞白血病知识库
pub const LEUKEMIA_KNOWLEDGE: &str = r#"## Acute Lymphoblastic Leukemia (ALL) Clinical Information

### Overview
Acute Lymphoblastic Leukemia (ALL) is a cancer of the blood and bone marrow that affects
white blood cells called lymphocytes. ALL is the most common type of cancer in children.

### Key Clinical Features
- Abnormal lymphoblast cells in blood/bone marrow
- Rapid progression if untreated
- 5-year survival rate: 85-90% with proper treatment

### Recommended Next Steps for Positive Screening
1. **Confirm Diagnosis**: Complete Blood Count (CBC) with differential
2. **Bone Marrow Biopsy**: Gold standard for ALL diagnosis
3. **Flow Cytometry**: Immunophenotyping of blast cells
4. **Cytogenetic Testing**: Chromosome analysis for prognosis
5. **Refer to Hematologist/Oncologist**: Specialized care required

### Risk Stratification
- Standard Risk: Age 1-9, WBC <50,000/uL
- High Risk: Age <1 or >10, WBC >50,000/uL

### Treatment Overview
- Induction chemotherapy
- Consolidation therapy
- Maintenance therapy (2-3 years)
- CNS prophylaxis
"#;

/// 临床顾问系统指令
pub fn advisor_system_instruction() -> String {
    format!(
        "You are a clinical advisor AI assistant. Based on the blood cell analysis \
showing potential leukemia, provide clinical recommendations.\n\n\
Use this knowledge base:\n{}\n\
Be professional, accurate, and emphasize that this is AI screening, not diagnosis.",
        LEUKEMIA_KNOWLEDGE
    )
}
