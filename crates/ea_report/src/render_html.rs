//! Self-contained HTML rendering (embedded template, no external assets).
//! Autoescaping is on because the template name ends in `.html`.

use minijinja::Environment;

use crate::{ReportError, ReportModel};

static TEMPLATE: &str = r#"<!doctype html>
<html lang="en"><meta charset="utf-8">
<title>{{ cover.title }} {{ cover.run_id }}</title>
<h1>{{ cover.title }}</h1>
<p>Run {{ cover.run_id }} at {{ cover.timestamp_utc }}. Engine {{ cover.engine }}.
Tie seed {{ cover.tie_seed }} ({{ cover.seed_source }}).</p>

<h2>Overview</h2>
<table>
  <tr><th>Students</th><td>{{ overview.considered_students }} of {{ overview.total_students }}</td></tr>
  <tr><th>Priority / regular</th><td>{{ overview.priority_students }} / {{ overview.regular_students }}</td></tr>
  <tr><th>Required tracks</th><td>{{ overview.required_tracks | join(", ") }}</td></tr>
  <tr><th>Assignments</th><td>{{ overview.total_assignments }} (priority {{ overview.priority_assignments }}, regular {{ overview.regular_assignments }}, fallback {{ overview.fallback_assignments }})</td></tr>
  <tr><th>Fully assigned</th><td>{{ overview.fully_assigned }} (priority {{ overview.priority_fully_assigned }}, regular {{ overview.regular_fully_assigned }})</td></tr>
  <tr><th>Partially assigned</th><td>{{ overview.partially_assigned }}</td></tr>
  <tr><th>Unassigned</th><td>{{ overview.unassigned }}</td></tr>
  <tr><th>Empty track slots</th><td>{{ overview.unplaced_slots }}</td></tr>
  <tr><th>Overall utilization</th><td>{{ overview.overall_utilization }}</td></tr>
</table>

<h2>Lotteries</h2>
<p>{{ lottery_stats.lotteries }} draws, {{ lottery_stats.candidates }} candidates, {{ lottery_stats.winners }} winners,
{{ lottery_stats.losers }} losers, success rate {{ lottery_stats.success_rate }}.</p>
{% if lottery_stats.per_course %}
<table>
  <tr><th>Course</th><th>Draws</th><th>Candidates</th></tr>
  {% for c in lottery_stats.per_course %}
  <tr><td>{{ c.course_name }} ({{ c.course_id }})</td><td>{{ c.lotteries }}</td><td>{{ c.candidates }}</td></tr>
  {% endfor %}
</table>
{% endif %}
{% for l in lotteries %}
<section class="lottery">
  <h3>#{{ l.sequence }} {{ l.course_name }} ({{ l.course_id }}), track {{ l.track }}, wave {{ l.wave }}</h3>
  <p>{{ l.candidates }} candidates for {{ l.seats }} seats, drawn {{ l.executed_utc }}</p>
  <p>Winners: {{ l.winners | join(", ") }}{% if l.winners_more %} and {{ l.winners_more }} more{% endif %}</p>
  <p>Losers: {{ l.losers | join(", ") }}{% if l.losers_more %} and {{ l.losers_more }} more{% endif %}</p>
</section>
{% endfor %}

<h2>Course utilization</h2>
<table>
  <tr><th>Course</th><th>Track</th><th>Assigned</th><th>Capacity</th><th>Utilization</th></tr>
  {% for c in utilization %}
  <tr><td>{{ c.name }} ({{ c.course_id }})</td><td>{{ c.track }}</td><td>{{ c.assigned }}</td><td>{{ c.capacity }}</td><td>{{ c.utilization }}</td></tr>
  {% endfor %}
</table>

<h2>Placements by preference rank</h2>
<ul>
  {% for b in rank_distribution %}<li>{{ b.rank }}: {{ b.count }}</li>
  {% endfor %}
</ul>

<h2>Student sample</h2>
{% for s in student_sample %}
<p><strong>{{ s.student_id }}</strong>{% if s.is_priority %} (priority){% endif %}:
{% for p in s.placements %}{{ p.track }} {{ p.course_name }} [{{ p.rank }}]{% if not loop.last %}; {% endif %}{% endfor %}</p>
{% endfor %}

<h2>Integrity</h2>
<p>Assignments {{ integrity.assignment_set_id }}<br>
Lottery log {{ integrity.lottery_log_id }}<br>
Stats sha256 {{ integrity.stats_sha256 }}<br>
Inputs: students {{ integrity.students_sha256 }}, courses {{ integrity.courses_sha256 }},
selections {{ integrity.selections_sha256 }}, params {{ integrity.params_sha256 }}</p>
</html>
"#;

pub fn render_html(model: &ReportModel) -> Result<String, ReportError> {
    let mut env = Environment::new();
    env.add_template("report.html", TEMPLATE)
        .map_err(|e| ReportError::Template(e.to_string()))?;
    let tmpl = env
        .get_template("report.html")
        .map_err(|e| ReportError::Template(e.to_string()))?;
    tmpl.render(model).map_err(|e| ReportError::Template(e.to_string()))
}
